use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiResult, AppState, AuthUser};
use crate::database::models::Pagination;
use crate::error::MarketplaceError;
use crate::notifications::{NotificationCenter, NotificationPage};

const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationAction {
    MarkRead,
    MarkAllRead,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub action: NotificationAction,
    pub notification_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<NotificationPage>> {
    let Query(query) = query?;
    let (page, limit) = Pagination::window(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let notifications = NotificationCenter::new(state.pool())
        .list(user.id(), page, limit, query.unread)
        .await?;
    Ok(Json(notifications))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let center = NotificationCenter::new(state.pool());

    match request.action {
        NotificationAction::MarkRead => {
            let id = request.notification_id.ok_or_else(|| {
                MarketplaceError::ValidationError("Notification ID is required".to_string())
            })?;
            center.mark_read(user.id(), &id).await?;
            Ok(Json(json!({ "success": true })))
        }
        NotificationAction::MarkAllRead => {
            let updated = center.mark_all_read(user.id()).await?;
            Ok(Json(json!({ "success": true, "updated": updated })))
        }
    }
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| MarketplaceError::ValidationError("Notification ID is required".to_string()))?;
    NotificationCenter::new(state.pool()).delete(user.id(), &id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn count(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let count = NotificationCenter::new(state.pool()).unread_count(user.id()).await?;
    Ok(Json(json!({ "count": count })))
}
