use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::token::errors::SingleUseTokenError;
use crate::domain::token::models::SingleUseToken;
use crate::domain::token::models::TokenEffect;
use crate::domain::user::models::UserId;

/// Persistence for single-use tokens.
#[async_trait]
pub trait SingleUseTokenRepository: Send + Sync + 'static {
    /// Store a token, replacing any existing token for the same user and
    /// purpose.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn upsert(&self, token: SingleUseToken) -> Result<(), SingleUseTokenError>;

    /// Atomically consume a live token and apply its effect.
    ///
    /// Deleting the token, checking `expires_at > now` and applying `effect`
    /// to the owner happen in one transaction. A concurrent consumer of the
    /// same token sees `None`.
    ///
    /// # Arguments
    /// * `token_hash` - SHA-256 hex of the presented token
    /// * `now` - Instant the expiry is checked against
    /// * `effect` - Mutation to apply; also selects the purpose
    ///
    /// # Returns
    /// Owner of the consumed token, or None if no live token matched
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed (nothing was applied)
    async fn consume(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        effect: TokenEffect,
    ) -> Result<Option<UserId>, SingleUseTokenError>;
}
