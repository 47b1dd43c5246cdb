//! Admin password hashing.
//!
//! Passwords are stored as argon2id PHC strings (algorithm, parameters and
//! salt embedded), so verification needs nothing but the stored hash.
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    if password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }

    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| CredentialError::Hash(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

/// `Ok(false)` on a wrong password, `Err` only when the stored hash is unusable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, CredentialError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| CredentialError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("kandy-2024").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("kandy-2024", &hash).unwrap());
        assert!(!verify_password("kandy-2025", &hash).unwrap());
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn plaintext_hash_is_not_accepted() {
        assert!(matches!(
            verify_password("admin123", "admin123"),
            Err(CredentialError::MalformedHash(_))
        ));
        assert!(matches!(hash_password(""), Err(CredentialError::EmptyPassword)));
    }
}
