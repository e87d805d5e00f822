//! Password hashing and verification

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plain-text password with Argon2id and a fresh salt
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    if plain.len() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort(MIN_PASSWORD_LENGTH));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a plain-text password against a stored hash
///
/// Returns false for both a wrong password and an unparseable hash; the
/// caller only needs a yes/no answer.
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// A syntactically valid Argon2id hash that matches no real password.
/// Verified against when login targets an unknown email so response timing
/// does not reveal which emails exist.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$Zm9vYmFyYmF6cXV4$9Qq7k1m2n3o4p5q6r7s8t9u0v1w2x3y4z5A6B7C8D9E";

/// Password errors
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must be at least {0} characters")]
    TooShort(usize),

    #[error("Failed to hash password: {0}")]
    Hash(String),
}
