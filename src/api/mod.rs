//! HTTP API
//!
//! Every route speaks JSON. Errors are rendered by [`MarketplaceError`] as
//! `{"error": "..."}` with the matching status code.

pub mod accounts;
pub mod auth;
pub mod business;
pub mod jobs;
pub mod messages;
pub mod notifications;
pub mod upload;
pub mod workers;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::accounts::SessionKeys;
use crate::config::AppConfig;
use crate::database::Database;
use crate::email::Postmaster;
use crate::error::MarketplaceError;
use crate::storage::ObjectStore;

pub use auth::AuthUser;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub sessions: SessionKeys,
    pub postmaster: Postmaster,
    /// `None` when no bucket is configured; uploads then answer 503.
    pub store: Option<Arc<dyn ObjectStore>>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: AppConfig,
        postmaster: Postmaster,
        store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let sessions = SessionKeys::new(&config.session.secret, config.session.ttl_hours);
        Self {
            db,
            config: Arc::new(config),
            sessions,
            postmaster,
            store,
        }
    }

    pub fn pool(&self) -> sqlx::SqlitePool {
        self.db.pool().clone()
    }
}

impl From<JsonRejection> for MarketplaceError {
    fn from(rejection: JsonRejection) -> Self {
        MarketplaceError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for MarketplaceError {
    fn from(rejection: QueryRejection) -> Self {
        MarketplaceError::ValidationError(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, MarketplaceError>;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Accounts
        .route("/api/auth/register", post(accounts::register))
        .route("/api/auth/login", post(accounts::login))
        .route("/api/auth/password-reset", post(accounts::request_password_reset))
        .route("/api/auth/password-reset/confirm", post(accounts::confirm_password_reset))
        .route("/api/user/type", post(accounts::set_user_type))
        // Job board
        .route("/api/skills", get(jobs::list_skills))
        .route("/api/jobs", get(jobs::search_jobs).post(jobs::create_job))
        .route(
            "/api/jobs/:id",
            get(jobs::get_job).put(jobs::update_job).delete(jobs::delete_job),
        )
        .route("/api/jobs/:id/apply", post(jobs::apply))
        .route("/api/jobs/:id/save", post(jobs::save_job).delete(jobs::unsave_job))
        // Businesses
        .route("/api/business/onboarding", post(business::onboarding))
        .route("/api/business/dashboard", get(business::dashboard))
        .route("/api/business/jobs", get(business::list_jobs))
        .route("/api/business/jobs/:id/applications", get(business::job_applications))
        .route("/api/business/applications/:id", patch(business::update_application))
        .route("/api/business/contracts", get(business::list_contracts))
        .route("/api/business/contracts/:id", patch(business::update_contract))
        // Workers
        .route("/api/workers/onboarding", post(workers::onboarding))
        .route("/api/workers/profile", get(workers::get_profile).put(workers::update_profile))
        .route("/api/workers/portfolio", get(workers::list_portfolio).post(workers::create_portfolio_item))
        .route(
            "/api/workers/portfolio/:id",
            get(workers::get_portfolio_item)
                .put(workers::update_portfolio_item)
                .delete(workers::delete_portfolio_item),
        )
        .route("/api/workers/applications", get(workers::list_applications))
        .route("/api/workers/applications/:id/withdraw", post(workers::withdraw_application))
        .route("/api/workers/contracts", get(workers::list_contracts))
        .route("/api/workers/saved-jobs", get(workers::saved_jobs))
        .route("/api/workers/:id", get(workers::public_profile))
        // Inbox
        .route("/api/messages", get(messages::list_conversations).post(messages::send_message))
        .route("/api/messages/:user_id", get(messages::get_conversation))
        .route(
            "/api/notifications",
            get(notifications::list).put(notifications::update).delete(notifications::delete),
        )
        .route("/api/notifications/count", get(notifications::count))
        .route("/api/upload", post(upload::create_upload_url))
        .route("/api/upload/download", get(upload::create_download_url))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).into_inner())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match state.db.health_check().await {
        Ok(()) => "healthy",
        Err(_) => "unavailable",
    };
    let status = if database == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": database,
            "service": "gigit",
            "storage": state.store.is_some(),
            "timestamp": chrono::Utc::now()
        })),
    )
}
