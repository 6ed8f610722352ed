//! Account registry
//!
//! Handles registration, credential login, role selection and password resets

use std::sync::OnceLock;

use chrono::{Duration, Utc};
use rand::RngCore;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::password::{hash_password, validate_password, verify_password};
use crate::database::models::{User, UserType};
use crate::database::new_id;
use crate::error::MarketplaceError;

const DUPLICATE_EMAIL: &str = "An account with this email already exists";
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
}

pub struct AccountRegistry {
    pool: SqlitePool,
    password_cost: u32,
}

impl AccountRegistry {
    pub fn new(pool: SqlitePool, password_cost: u32) -> Self {
        Self { pool, password_cost }
    }

    /// Create a user and, when enough details are given, its role profile.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, MarketplaceError> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(MarketplaceError::ValidationError("Invalid email address".to_string()));
        }
        validate_password(&request.password)?;
        if request.user_type == UserType::Admin {
            return Err(MarketplaceError::ValidationError("Invalid user type".to_string()));
        }

        if self.find_by_email(&email).await?.is_some() {
            return Err(MarketplaceError::ValidationError(DUPLICATE_EMAIL.to_string()));
        }

        let password_hash = hash_password(&request.password, self.password_cost).await?;
        let first_name = non_blank(request.first_name.as_deref());
        let last_name = non_blank(request.last_name.as_deref());
        let company_name = non_blank(request.company_name.as_deref());

        let name = match request.user_type {
            UserType::Worker => {
                let full = format!("{} {}", first_name.unwrap_or(""), last_name.unwrap_or(""));
                non_blank(Some(full.trim())).map(str::to_string)
            }
            _ => company_name.map(str::to_string),
        };

        let now = Utc::now();
        let user_id = new_id();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, user_type, onboarding_completed,
                               email_verified, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, FALSE, ?, ?, ?)
            "#,
        )
        .bind(&user_id)
        .bind(&email)
        .bind(&password_hash)
        .bind(&name)
        .bind(request.user_type)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if MarketplaceError::is_unique_violation(&e) {
                return Err(MarketplaceError::ValidationError(DUPLICATE_EMAIL.to_string()));
            }
            return Err(e.into());
        }

        match (request.user_type, first_name, last_name, company_name) {
            (UserType::Worker, Some(first), Some(last), _) => {
                sqlx::query(
                    r#"
                    INSERT INTO worker_profiles (id, user_id, first_name, last_name, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(new_id())
                .bind(&user_id)
                .bind(first)
                .bind(last)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            (UserType::Business, _, _, Some(company)) => {
                sqlx::query(
                    r#"
                    INSERT INTO business_profiles (id, user_id, company_name, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(new_id())
                .bind(&user_id)
                .bind(company)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            _ => {}
        }

        tx.commit().await?;
        info!("Registered {:?} account {}", request.user_type, user_id);

        self.find_user(&user_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("User"))
    }

    /// Check credentials and record the login time.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, MarketplaceError> {
        let email = normalize_email(email);
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or_else(|| MarketplaceError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(MarketplaceError::AuthenticationError(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(password, hash).await? {
            warn!("Failed login for user {}", user.id);
            return Err(MarketplaceError::AuthenticationError(INVALID_CREDENTIALS.to_string()));
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(&user.id)
            .execute(&self.pool)
            .await?;

        Ok(User {
            last_login: Some(now),
            ..user
        })
    }

    pub async fn find_user(&self, user_id: &str) -> Result<Option<User>, MarketplaceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, MarketplaceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn set_user_type(&self, user_id: &str, user_type: UserType) -> Result<(), MarketplaceError> {
        if user_type == UserType::Admin {
            return Err(MarketplaceError::ValidationError("Invalid user type".to_string()));
        }

        let result = sqlx::query("UPDATE users SET user_type = ?, updated_at = ? WHERE id = ?")
            .bind(user_type)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MarketplaceError::not_found("User"));
        }
        Ok(())
    }

    /// Store a one-hour reset token for `email`.
    ///
    /// Returns the user and the raw token to mail out, or `None` for unknown
    /// addresses so callers can answer identically either way.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, MarketplaceError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };

        let mut raw = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        let token = hex::encode(raw);
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (token_hash, user_id, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(hash_token(&token))
        .bind(&user.id)
        .bind(now + Duration::hours(RESET_TOKEN_TTL_HOURS))
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!("Issued password reset token for user {}", user.id);
        Ok(Some((user, token)))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), MarketplaceError> {
        validate_password(new_password)?;
        let password_hash = hash_password(new_password, self.password_cost).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let user_id: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE password_reset_tokens SET used_at = ?
            WHERE token_hash = ? AND used_at IS NULL AND expires_at > ?
            RETURNING user_id
            "#,
        )
        .bind(now)
        .bind(hash_token(token))
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Err(MarketplaceError::ValidationError(
                "Invalid or expired reset token".to_string(),
            ));
        };

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(now)
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Password reset for user {}", user_id);
        Ok(())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
        .is_match(email)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("worker@example.com"));
        assert!(!is_valid_email("worker@example"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn test_reset_tokens_are_stored_hashed() {
        let hashed = hash_token("abc");
        assert_eq!(hashed.len(), 64);
        assert_ne!(hashed, "abc");
    }
}
