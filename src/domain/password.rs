use crate::error::ShippingError;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, ShippingError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ShippingError::InternalError(format!("password hashing failed: {e}").into()))
}

/// Verify a password against a PHC hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<(), ShippingError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| ShippingError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ShippingError::InvalidCredentials)
}
