use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Json,
};
use serde::Deserialize;

use super::{ApiResult, AppState, AuthUser};
use crate::error::MarketplaceError;
use crate::storage::{prepare_download, prepare_upload, DownloadTicket, ObjectStore, UploadRequest, UploadTicket};

/// Presign a direct-to-bucket PUT for the caller.
pub async fn create_upload_url(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> ApiResult<Json<UploadTicket>> {
    let Json(request) = payload?;
    let ticket = prepare_upload(configured_store(&state)?, user.id(), &request).await?;
    Ok(Json(ticket))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub key: String,
}

/// Presign a short-lived GET for one of the caller's private files.
pub async fn create_download_url(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> ApiResult<Json<DownloadTicket>> {
    let Query(query) = query?;
    let ticket = prepare_download(configured_store(&state)?, user.id(), &query.key).await?;
    Ok(Json(ticket))
}

fn configured_store(state: &AppState) -> Result<&dyn ObjectStore, MarketplaceError> {
    state
        .store
        .as_deref()
        .ok_or_else(|| MarketplaceError::ServiceUnavailable("File storage is not configured".to_string()))
}
