//! Room password hashing and verification
//!
//! Private rooms may be protected by a password. Only the Argon2id PHC
//! string is stored.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{AppError, AppResult};

const MIN_ROOM_PASSWORD_LEN: usize = 4;
const MAX_ROOM_PASSWORD_LEN: usize = 128;

/// Hash a room password using Argon2id
pub fn hash_room_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))
}

/// Check a supplied room password against the stored hash
pub fn verify_room_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Room passwords are shared secrets, so only their length is checked
pub fn validate_room_password(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    if !(MIN_ROOM_PASSWORD_LEN..=MAX_ROOM_PASSWORD_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "Room password must be {MIN_ROOM_PASSWORD_LEN}-{MAX_ROOM_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_room_password("open sesame").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_room_password("open sesame", &hash).unwrap());
        assert!(!verify_room_password("open barley", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_room_password("same").unwrap();
        let b = hash_room_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_hash_is_an_error() {
        assert!(verify_room_password("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_room_password("abc").is_err());
        assert!(validate_room_password("abcd").is_ok());
        assert!(validate_room_password(&"x".repeat(129)).is_err());
    }
}
