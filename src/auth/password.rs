use crate::error::AppError;
use actix_web::web;
use bcrypt::{hash, verify};

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

/// Checks `password` against a bcrypt hash. The digest comparison inside
/// `bcrypt::verify` is constant-time.
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

/// Runs `hash_password` on the blocking thread pool.
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, AppError> {
    web::block(move || hash_password(&password, cost)).await?
}

/// Runs `verify_password` on the blocking thread pool.
pub async fn verify_password_blocking(
    password: String,
    hashed_password: String,
) -> Result<bool, AppError> {
    web::block(move || verify_password(&password, &hashed_password)).await?
}
