use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;

use super::errors::PasswordError;

/// Salted, memory-hard secret hashing (Argon2id).
///
/// Used for user passwords and for the at-rest hash of refresh tokens. The
/// salt and parameters are embedded in the PHC string, so verification only
/// needs the stored hash and the candidate secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a secret with a freshly generated salt.
    ///
    /// # Returns
    /// PHC string format hash (algorithm, parameters, salt and digest)
    ///
    /// # Errors
    /// * `HashingFailed` - Argon2 could not produce a hash (e.g. allocation failure)
    pub fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a secret against a stored PHC hash.
    ///
    /// The digest comparison inside `argon2` is constant-time.
    ///
    /// # Returns
    /// True if the secret matches, false otherwise
    ///
    /// # Errors
    /// * `MalformedHash` - Stored hash is not a valid PHC string
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
