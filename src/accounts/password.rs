//! Password hashing
//!
//! bcrypt is CPU-bound, so both directions run on the blocking pool.

use crate::error::MarketplaceError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_password(password: &str) -> Result<(), MarketplaceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(MarketplaceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, MarketplaceError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| MarketplaceError::InternalError(format!("Hashing task failed: {}", e)))?
        .map_err(|e| MarketplaceError::InternalError(format!("Failed to hash password: {}", e)))
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, MarketplaceError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| MarketplaceError::InternalError(format!("Hashing task failed: {}", e)))?
        .map_err(|e| MarketplaceError::InternalError(format!("Failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_passwords_rejected() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("Worker@123", 4 /* bcrypt minimum cost */).await.unwrap();
        assert!(verify_password("Worker@123", &hash).await.unwrap());
        assert!(!verify_password("Worker@124", &hash).await.unwrap());
    }
}
