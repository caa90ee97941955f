use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::ReplacementToken;
use crate::domain::session::models::RotationOutcome;
use crate::domain::user::models::UserId;

/// Checks a presented token against a stored KDF hash.
///
/// Blocking (Argon2); stores call it on the blocking pool while the row is
/// locked.
pub type TokenHashCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Persistence for refresh tokens.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + 'static {
    /// Persist a new active session row.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn insert(&self, token: RefreshToken) -> Result<(), SessionError>;

    /// Session row by lookup hash, whatever its state. Takes no lock.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_lookup(
        &self,
        lookup_hash: &str,
    ) -> Result<Option<RefreshToken>, SessionError>;

    /// Rotate the session located by `lookup_hash` in one transaction.
    ///
    /// Locks the row, checks expiry and revocation, runs `check` against the
    /// stored `token_hash`, revokes the row and inserts `replacement`. Only
    /// `Rotated` commits; every other outcome leaves the store unchanged.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed (rolled back)
    async fn rotate(
        &self,
        lookup_hash: &str,
        replacement: ReplacementToken,
        now: DateTime<Utc>,
        check: TokenHashCheck,
    ) -> Result<RotationOutcome, SessionError>;

    /// Revoke every active session of a user.
    ///
    /// # Returns
    /// Number of sessions revoked
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn revoke_all(&self, user_id: UserId, now: DateTime<Utc>) -> Result<u64, SessionError>;
}
