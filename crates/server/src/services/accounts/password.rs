//! Argon2id password hashing, run on the blocking pool.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};

use super::AccountError;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length. Bounds hashing cost per request.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Validate password meets requirements.
pub fn validate_password(password: &SecretString) -> Result<(), AccountError> {
    let len = password.expose_secret().chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(AccountError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(AccountError::InvalidInput(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
pub async fn hash_password(password: SecretString) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AccountError::Internal(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| AccountError::Internal(format!("hashing task failed: {e}")))?
}

/// Check a password against a stored hash.
///
/// Returns `Ok(false)` on mismatch; an unparseable hash is an internal error.
pub async fn verify_password(password: SecretString, hash: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| AccountError::Internal(format!("stored hash is invalid: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AccountError::Internal(format!("hashing task failed: {e}")))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[test]
    fn test_validate_password_bounds() {
        assert!(validate_password(&secret("short")).is_err());
        assert!(validate_password(&secret("long enough")).is_ok());
        assert!(validate_password(&secret(&"x".repeat(129))).is_err());
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password(secret("correct horse")).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(secret("correct horse"), hash.clone()).await.unwrap());
        assert!(!verify_password(secret("wrong horse"), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_salted_differently() {
        let a = hash_password(secret("correct horse")).await.unwrap();
        let b = hash_password(secret("correct horse")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_is_internal() {
        let result = verify_password(secret("anything"), "not-a-hash".to_owned()).await;
        assert!(matches!(result, Err(AccountError::Internal(_))));
    }
}
