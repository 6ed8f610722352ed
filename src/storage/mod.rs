//! Object storage for resumes, images and documents
//!
//! Files never pass through the server: clients receive a presigned PUT
//! URL and upload directly to the bucket.

pub mod keys;
pub mod s3;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::MarketplaceError;

pub use keys::{generate_file_key, sanitize_filename, UploadFolder, UploadRequest, MAX_UPLOAD_BYTES};
pub use s3::S3Store;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, MarketplaceError>;

    async fn presign_download(&self, key: &str) -> Result<String, MarketplaceError>;

    async fn delete(&self, key: &str) -> Result<(), MarketplaceError>;

    /// Base URL objects are publicly served from, without a trailing slash.
    fn public_base_url(&self) -> &str;

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url().trim_end_matches('/'), key)
    }

    /// Inverse of [`ObjectStore::public_url`]; `None` for foreign URLs.
    fn extract_key_from_url(&self, url: &str) -> Option<String> {
        let base = self.public_base_url().trim_end_matches('/');
        url.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub upload_url: String,
    pub key: String,
    pub public_url: String,
}

/// Validate an upload request and presign a PUT for it.
pub async fn prepare_upload(
    store: &dyn ObjectStore,
    user_id: &str,
    request: &UploadRequest,
) -> Result<UploadTicket, MarketplaceError> {
    let folder = request.validate()?;
    let key = generate_file_key(folder, user_id, &request.filename, Utc::now().timestamp_millis());
    let upload_url = store.presign_upload(&key, &request.content_type).await?;

    debug!("Presigned upload {} for user {}", key, user_id);
    Ok(UploadTicket {
        upload_url,
        public_url: store.public_url(&key),
        key,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTicket {
    pub download_url: String,
    pub key: String,
}

/// Presign a GET for one of the caller's own objects. Keys must follow the
/// `{folder}/{user_id}/{file}` layout with the caller's id in the middle.
pub async fn prepare_download(
    store: &dyn ObjectStore,
    user_id: &str,
    key: &str,
) -> Result<DownloadTicket, MarketplaceError> {
    let key = key.trim();
    let mut parts = key.splitn(3, '/');
    let (folder, owner, file) = match (parts.next(), parts.next(), parts.next()) {
        (Some(folder), Some(owner), Some(file)) if !file.is_empty() && !file.contains('/') => (folder, owner, file),
        _ => return Err(MarketplaceError::ValidationError("Invalid file key".to_string())),
    };
    folder.parse::<UploadFolder>()?;
    if owner != user_id {
        return Err(MarketplaceError::forbidden());
    }

    let download_url = store.presign_download(key).await?;
    debug!("Presigned download {} for user {}", key, user_id);
    Ok(DownloadTicket {
        download_url,
        key: key.to_string(),
    })
}

/// Delete stored objects by public URL, logging failures instead of
/// returning them.
pub async fn delete_urls_best_effort(store: &dyn ObjectStore, urls: &[String]) {
    for url in urls {
        let Some(key) = store.extract_key_from_url(url) else {
            continue;
        };
        if let Err(e) = store.delete(&key).await {
            warn!("Failed to delete stored object {}: {}", key, e);
        }
    }
}
