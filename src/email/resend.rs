use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use super::{Mailer, OutgoingEmail};
use crate::error::MarketplaceError;

/// Mailer for the Resend HTTP API (`POST {base}/emails`).
pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    pub fn new(api_base_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/emails", api_base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MarketplaceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from,
                to: [email.to.as_str()],
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await
            .map_err(|e| MarketplaceError::EmailError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketplaceError::EmailError(format!(
                "Provider returned {}: {}",
                status, body
            )));
        }

        debug!("Sent \"{}\" to {}", email.subject, email.to);
        Ok(())
    }
}

/// Development mailer that only logs what would have been sent.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MarketplaceError> {
        info!("Email to {}: {}", email.to, email.subject);
        Ok(())
    }
}
