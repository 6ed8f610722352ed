//! S3-compatible object store (Cloudflare R2 in production).

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tracing::info;

use super::ObjectStore;
use crate::config::StorageConfig;
use crate::error::MarketplaceError;

pub struct S3Store {
    client: Client,
    bucket: String,
    public_url: String,
    presign_expiry: Duration,
}

impl S3Store {
    pub async fn connect(config: &StorageConfig) -> Result<Self, MarketplaceError> {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "gigit-config",
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        info!("Object store ready (bucket {} at {})", config.bucket, config.endpoint);

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            presign_expiry: Duration::from_secs(config.presign_expiry_secs),
        })
    }

    fn presigning(&self) -> Result<PresigningConfig, MarketplaceError> {
        PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| MarketplaceError::StorageError(format!("Invalid presign expiry: {}", e)))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn presign_upload(&self, key: &str, content_type: &str) -> Result<String, MarketplaceError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(self.presigning()?)
            .await
            .map_err(|e| MarketplaceError::StorageError(format!("Failed to presign upload: {}", e)))?;

        Ok(request.uri().to_string())
    }

    async fn presign_download(&self, key: &str) -> Result<String, MarketplaceError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning()?)
            .await
            .map_err(|e| MarketplaceError::StorageError(format!("Failed to presign download: {}", e)))?;

        Ok(request.uri().to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), MarketplaceError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| MarketplaceError::StorageError(format!("Failed to delete {}: {}", key, e)))?;
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        &self.public_url
    }
}
