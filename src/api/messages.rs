use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::{ApiResult, AppState, AuthUser};
use crate::messaging::{ConversationSummary, ConversationThread, Inbox, MessageView, SendMessage};

#[derive(Debug, Default, Deserialize)]
pub struct ThreadWindow {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let conversations = Inbox::new(state.pool()).list_conversations(user.id()).await?;
    Ok(Json(conversations))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<SendMessage>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageView>)> {
    let Json(request) = payload?;
    let message = Inbox::new(state.pool()).send_message(&user.0, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(other_user_id): Path<String>,
    query: Result<Query<ThreadWindow>, QueryRejection>,
) -> ApiResult<Json<ConversationThread>> {
    let Query(window) = query?;
    let thread = Inbox::new(state.pool())
        .get_conversation(user.id(), &other_user_id, window.page, window.limit)
        .await?;
    Ok(Json(thread))
}
