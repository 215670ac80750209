use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Rules a freshly chosen password must satisfy, at signup and at reset.
/// `field` names the input the length error is reported against.
pub fn check_new_password(field: &str, password: &str, confirm: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            field,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long."),
        ));
    }
    if password != confirm {
        return Err(AppError::validation("confirm_password", "Passwords do not match."));
    }
    Ok(())
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash failed");
            anyhow::anyhow!("hash password: {e}")
        })
}

/// False on mismatch; errors only when the stored hash itself is unreadable.
pub fn verify_password(plain: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "stored password hash unreadable");
        anyhow::anyhow!("parse password hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies_only_itself() {
        let hash = hash_password("Secur3P@ssw0rd!").expect("hash");
        assert!(verify_password("Secur3P@ssw0rd!", &hash).unwrap());
        assert!(!verify_password("secur3p@ssw0rd!", &hash).unwrap());
    }

    #[test]
    fn unreadable_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-valid-hash").is_err());
    }

    #[test]
    fn new_password_rules() {
        assert!(check_new_password("password", "longenough", "longenough").is_ok());

        match check_new_password("new_password", "short", "short") {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "new_password"),
            other => panic!("unexpected {other:?}"),
        }
        match check_new_password("password", "longenough", "longenougH") {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "confirm_password"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
