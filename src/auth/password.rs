//! Password hashing and verification
//!
//! bcrypt with a per-hash random salt embedded in the output string.

use thiserror::Error;

/// bcrypt work factor. Fixed for the deployment; raising it only affects
/// hashes created afterwards, verification reads the cost from the hash.
const BCRYPT_COST: u32 = 10;

/// Password hashing errors
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
}

/// Hash a plaintext password.
///
/// The salt is generated internally and embedded in the returned string,
/// so two hashes of the same plaintext differ.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    bcrypt::hash(plain, BCRYPT_COST).map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Verify a plaintext password against a stored hash.
///
/// Returns `false` for a mismatch and for any malformed hash; callers
/// never need to distinguish the two.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}
