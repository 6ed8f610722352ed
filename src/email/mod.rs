//! Outbound transactional email

pub mod resend;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::config::EmailConfig;
use crate::error::MarketplaceError;

pub use resend::{LogMailer, ResendMailer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MarketplaceError>;
}

/// Pick the HTTP mailer when an API key is configured, otherwise log.
pub fn mailer_from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    match config.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => Arc::new(ResendMailer::new(&config.api_base_url, key, &config.from_address)),
        None => {
            warn!("No email API key configured; outgoing email will only be logged");
            Arc::new(LogMailer)
        }
    }
}

/// Template-aware front for a [`Mailer`].
#[derive(Clone)]
pub struct Postmaster {
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl Postmaster {
    pub fn new(mailer: Arc<dyn Mailer>, app_url: impl Into<String>) -> Self {
        Self {
            mailer,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn send_verification(&self, to: &str, name: Option<&str>, token: &str) -> Result<(), MarketplaceError> {
        self.mailer
            .send(templates::verification(to, name, &self.app_url, token))
            .await
    }

    pub async fn send_password_reset(&self, to: &str, name: Option<&str>, token: &str) -> Result<(), MarketplaceError> {
        self.mailer
            .send(templates::password_reset(to, name, &self.app_url, token))
            .await
    }

    pub async fn send_welcome(&self, to: &str, name: Option<&str>) -> Result<(), MarketplaceError> {
        self.mailer.send(templates::welcome(to, name, &self.app_url)).await
    }
}
