use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;

/// Access token issuer.
///
/// Signs and verifies short-lived, self-contained access tokens. Holding the
/// signing secret is all a process needs to verify a token; there is no
/// server-side state.
pub struct TokenIssuer {
    jwt_handler: JwtHandler,
}

impl TokenIssuer {
    /// Create a new issuer.
    ///
    /// # Arguments
    /// * `secret` - Server-side HMAC secret
    pub fn new(secret: &[u8]) -> Self {
        Self {
            jwt_handler: JwtHandler::new(secret),
        }
    }

    /// Sign an access token binding identity, role and nick.
    ///
    /// # Arguments
    /// * `user_id` - Numeric user identifier
    /// * `role` - Role name
    /// * `nick` - Display nickname
    /// * `ttl` - Lifetime of the token
    /// * `issued_at` - Issue instant (normally "now")
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn sign(
        &self,
        user_id: i64,
        role: &str,
        nick: &str,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = Claims::new(user_id, role, nick, issued_at, ttl);
        self.jwt_handler.encode(&claims)
    }

    /// Verify signature, algorithm and expiry of an access token.
    ///
    /// # Arguments
    /// * `token` - Compact JWT string
    /// * `now` - Instant the token is checked against
    ///
    /// # Errors
    /// * `AlgorithmMismatch` - Token header names another algorithm
    /// * `InvalidToken` - Malformed or wrongly signed token
    /// * `TokenExpired` - `now` is at or past `exp`
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let claims: Claims = self.jwt_handler.decode(token)?;

        if claims.is_expired(now.timestamp()) {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims)
    }
}
