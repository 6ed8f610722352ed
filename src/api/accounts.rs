use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ApiResult, AppState, AuthUser};
use crate::accounts::{AccountRegistry, RegisterRequest};
use crate::database::models::{User, UserType};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypeRequest {
    pub user_type: UserType,
}

fn registry(state: &AppState) -> AccountRegistry {
    AccountRegistry::new(state.pool(), state.config.session.password_cost)
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let Json(request) = payload?;
    let user = registry(&state).register(request).await?;

    if let Err(e) = state.postmaster.send_welcome(&user.email, user.name.as_deref()).await {
        warn!("Welcome email to {} failed: {}", user.email, e);
    }

    let token = state.sessions.issue(&user.id)?;
    Ok((StatusCode::CREATED, Json(SessionResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Json(request) = payload?;
    let user = registry(&state).login(&request.email, &request.password).await?;
    let token = state.sessions.issue(&user.id)?;
    Ok(Json(SessionResponse { token, user }))
}

/// Always answers the same way so the endpoint cannot be used to discover
/// which addresses have accounts.
pub async fn request_password_reset(
    State(state): State<AppState>,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;

    if let Some((user, token)) = registry(&state).request_password_reset(&request.email).await? {
        if let Err(e) = state
            .postmaster
            .send_password_reset(&user.email, user.name.as_deref(), &token)
            .await
        {
            warn!("Password reset email to {} failed: {}", user.email, e);
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "If an account exists for that email, a reset link has been sent"
    })))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    payload: Result<Json<PasswordResetConfirm>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    registry(&state).reset_password(&request.token, &request.password).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn set_user_type(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<UserTypeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    registry(&state).set_user_type(user.id(), request.user_type).await?;
    info!("User {} chose type {:?}", user.id(), request.user_type);
    Ok(Json(json!({ "success": true })))
}
