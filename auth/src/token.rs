//! Opaque bearer tokens (refresh and single-use tokens).
//!
//! Raw tokens are only ever handed to the client. Stores keep
//! [`lookup_hash`] for indexed lookup, plus a KDF hash where the threat model
//! calls for it.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// Random bytes per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// Generate a fresh high-entropy token, hex encoded.
///
/// # Errors
/// * `GenerationFailed` - The OS random source is unavailable
pub fn generate() -> Result<String, TokenError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::GenerationFailed(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Deterministic SHA-256 digest of a token, hex encoded.
pub fn lookup_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate_is_hex_of_expected_length() {
        let token = generate().expect("Failed to generate token");
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_does_not_repeat() {
        let tokens: HashSet<String> = (0..100)
            .map(|_| generate().expect("Failed to generate token"))
            .collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_lookup_hash_is_stable_and_distinct() {
        let hash = lookup_hash("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(lookup_hash("abc"), lookup_hash("abd"));
    }
}
