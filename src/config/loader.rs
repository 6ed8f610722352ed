//! Configuration loader
//! Layers defaults, an optional TOML file and environment variables

use config::{Config, Environment, File, FileFormat};
use tracing::info;

use super::AppConfig;
use crate::error::MarketplaceError;

pub const ENV_PREFIX: &str = "GIGIT";

/// Development secret; `AppConfig::validate` accepts it so local runs work
/// out of the box, deployments override it through `GIGIT_SESSION__SECRET`.
const DEV_SESSION_SECRET: &str = "gigit-development-session-secret-change-me";

pub fn load(path: &str) -> Result<AppConfig, MarketplaceError> {
    info!("Loading configuration from {} and {}_* environment", path, ENV_PREFIX);

    let settings = Config::builder()
        .set_default("server_host", "0.0.0.0")
        .and_then(|b| b.set_default("server_port", 3000))
        .and_then(|b| b.set_default("database_url", "sqlite://gigit.db?mode=rwc"))
        .and_then(|b| b.set_default("database_max_connections", 10))
        .and_then(|b| b.set_default("app_url", "http://localhost:3000"))
        .and_then(|b| b.set_default("session.secret", DEV_SESSION_SECRET))
        .and_then(|b| b.set_default("session.ttl_hours", 24 * 30))
        .and_then(|b| b.set_default("session.password_cost", bcrypt::DEFAULT_COST as i64))
        .and_then(|b| b.set_default("email.api_base_url", "https://api.resend.com"))
        .and_then(|b| b.set_default("email.from_address", "GigIt <noreply@gigit.com>"))
        .map_err(config_error)?
        .add_source(File::new(path, FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(config_error)?;

    settings.try_deserialize().map_err(config_error)
}

fn config_error(err: config::ConfigError) -> MarketplaceError {
    MarketplaceError::ConfigError(err.to_string())
}
