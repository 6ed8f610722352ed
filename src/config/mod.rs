//! Service configuration
//!
//! Values come from built-in defaults, an optional TOML file and
//! `GIGIT_*` environment variables, in that order of precedence.

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::error::MarketplaceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    /// Public base URL of the web front end, used in email links.
    pub app_url: String,
    pub session: SessionConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
    /// bcrypt cost factor for password hashes.
    pub password_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub from_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_url: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry_secs: u64,
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_presign_expiry() -> u64 {
    3600
}

impl AppConfig {
    /// Load configuration from `path` (if present) and the environment.
    pub fn load(path: &str) -> Result<Self, MarketplaceError> {
        let config = loader::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MarketplaceError> {
        if self.server_port == 0 {
            return Err(MarketplaceError::ConfigError(
                "server_port must be non-zero".to_string(),
            ));
        }

        if self.session.secret.len() < 32 {
            return Err(MarketplaceError::ConfigError(
                "session.secret must be at least 32 bytes".to_string(),
            ));
        }

        if self.session.ttl_hours <= 0 {
            return Err(MarketplaceError::ConfigError(
                "session.ttl_hours must be positive".to_string(),
            ));
        }

        if let Some(storage) = &self.storage {
            if storage.bucket.is_empty() || storage.endpoint.is_empty() {
                return Err(MarketplaceError::ConfigError(
                    "storage.bucket and storage.endpoint are required".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
