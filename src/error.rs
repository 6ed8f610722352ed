use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

impl From<serde_json::Error> for MarketplaceError {
    fn from(err: serde_json::Error) -> Self {
        Self::ValidationError(format!("Invalid JSON: {}", err))
    }
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for MarketplaceError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::DatabaseError(format!("Migration error: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    AuthenticationError(String),

    #[error("{0}")]
    PermissionError(String),

    #[error("{0}")]
    NotFoundError(String),

    #[error("{0}")]
    ConflictError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Email delivery error: {0}")]
    EmailError(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T, E = MarketplaceError> = std::result::Result<T, E>;

impl MarketplaceError {
    pub fn unauthorized() -> Self {
        Self::AuthenticationError("Unauthorized".to_string())
    }

    pub fn forbidden() -> Self {
        Self::PermissionError("Unauthorized".to_string())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFoundError(format!("{} not found", what))
    }

    pub fn worker_profile_missing() -> Self {
        Self::not_found("Worker profile")
    }

    pub fn business_profile_missing() -> Self {
        Self::not_found("Business profile")
    }

    /// True when the wrapped sqlx error was a UNIQUE constraint violation.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) | Self::SessionError(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionError(_) => StatusCode::FORBIDDEN,
            Self::NotFoundError(_) => StatusCode::NOT_FOUND,
            Self::ConflictError(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConfigError(_)
            | Self::DatabaseError(_)
            | Self::StorageError(_)
            | Self::EmailError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::SessionError(_) => "Unauthorized".to_string(),
            _ if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE => {
                error!("Request failed: {}", self);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = MarketplaceError::ValidationError("Password must be at least 8 characters".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Password must be at least 8 characters");
    }

    #[test]
    fn test_server_errors_map_to_500() {
        let err = MarketplaceError::DatabaseError("disk I/O error".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(MarketplaceError::forbidden().status_code(), StatusCode::FORBIDDEN);
    }
}
