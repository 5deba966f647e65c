use crate::error::{AppError, AppResult};

/// Hash a password for storage. Each call salts independently, so two
/// hashes of the same password differ.
pub fn hash(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored hash - constant-time via bcrypt.
pub fn verify(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}
