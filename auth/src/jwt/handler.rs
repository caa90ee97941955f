use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;

use super::errors::JwtError;

/// JWT handler for encoding and decoding tokens.
///
/// Generic over the claims type. The algorithm is fixed to HS256 at
/// construction and the decoder only accepts that algorithm, whatever the
/// token header claims.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtHandler {
    /// Create a new JWT handler with a secret key.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        }
    }

    /// Encode claims into a signed JWT.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Decode a JWT, checking signature, algorithm and the presence of `exp`.
    ///
    /// Expiry itself is not compared here: callers compare `exp` against
    /// their own clock so that time is injectable.
    ///
    /// # Errors
    /// * `AlgorithmMismatch` - Header names an algorithm other than HS256
    /// * `InvalidToken` - Malformed token, bad signature or missing `exp`
    pub fn decode<T: for<'de> Deserialize<'de>>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let token_data =
            decode::<T>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::InvalidAlgorithm => JwtError::AlgorithmMismatch,
                _ => JwtError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestClaims {
        sub: String,
        role: String,
        exp: i64,
    }

    fn claims() -> TestClaims {
        TestClaims {
            sub: "user123".to_string(),
            role: "admin".to_string(),
            exp: 4_102_444_800,
        }
    }

    #[test]
    fn test_encode_and_decode() {
        let handler = JwtHandler::new(b"my_secret_key_at_least_32_bytes_long!");

        let token = handler.encode(&claims()).expect("Failed to encode token");
        assert!(!token.is_empty());

        let decoded: TestClaims = handler.decode(&token).expect("Failed to decode token");
        assert_eq!(decoded, claims());
    }

    #[test]
    fn test_decode_invalid_token() {
        let handler = JwtHandler::new(b"my_secret_key_at_least_32_bytes_long!");

        let result = handler.decode::<TestClaims>("invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_decode_with_wrong_secret() {
        let handler1 = JwtHandler::new(b"secret1_at_least_32_bytes_long_key!");
        let handler2 = JwtHandler::new(b"secret2_at_least_32_bytes_long_key!");

        let token = handler1.encode(&claims()).expect("Failed to encode token");

        let result = handler2.decode::<TestClaims>(&token);
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_decode_rejects_other_algorithm() {
        let secret = b"my_secret_key_at_least_32_bytes_long!";
        let handler = JwtHandler::new(secret);

        // Same secret, different HMAC variant in the header.
        let forged = encode(
            &Header::new(Algorithm::HS512),
            &claims(),
            &EncodingKey::from_secret(secret),
        )
        .expect("Failed to encode forged token");

        let result = handler.decode::<TestClaims>(&forged);
        assert_eq!(result, Err(JwtError::AlgorithmMismatch));
    }

    #[test]
    fn test_decode_requires_exp() {
        #[derive(Serialize, Deserialize)]
        struct NoExpiry {
            sub: String,
        }

        let handler = JwtHandler::new(b"my_secret_key_at_least_32_bytes_long!");
        let token = handler
            .encode(&NoExpiry {
                sub: "user123".to_string(),
            })
            .expect("Failed to encode token");

        let result = handler.decode::<NoExpiry>(&token);
        assert!(matches!(result, Err(JwtError::InvalidToken(_))));
    }
}
