use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use super::AppState;
use crate::accounts::AccountRegistry;
use crate::database::models::{BusinessProfile, User, WorkerProfile};
use crate::error::MarketplaceError;
use crate::profiles::{BusinessProfiles, WorkerProfiles};

/// The caller behind a valid `Authorization: Bearer <token>` header.
///
/// The user row is reloaded on every request so role and onboarding
/// changes apply immediately. Use `Option<AuthUser>` for routes that also
/// serve anonymous callers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub async fn worker_profile(&self, state: &AppState) -> Result<WorkerProfile, MarketplaceError> {
        WorkerProfiles::new(state.pool()).require_by_user(self.id()).await
    }

    pub async fn business_profile(&self, state: &AppState) -> Result<BusinessProfile, MarketplaceError> {
        BusinessProfiles::new(state.pool()).require_by_user(self.id()).await
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = MarketplaceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(MarketplaceError::unauthorized)?;
        let claims = state.sessions.verify(token)?;

        let registry = AccountRegistry::new(state.pool(), state.config.session.password_cost);
        match registry.find_user(&claims.sub).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                debug!("Session for deleted user {}", claims.sub);
                Err(MarketplaceError::unauthorized())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/jobs");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
