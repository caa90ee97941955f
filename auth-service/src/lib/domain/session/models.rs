use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::user::models::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshTokenId(pub Uuid);

impl RefreshTokenId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RefreshTokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RefreshTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One logical session.
///
/// `lookup_hash` (SHA-256) locates the row; `token_hash` (Argon2id) is
/// verified after the row is locked. Once `revoked_at` is set the row is
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub lookup_hash: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub device_info: Option<String>,
    pub source_ip: Option<String>,
}

impl RefreshToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Client context recorded with a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMetadata {
    pub device_info: Option<String>,
    pub source_ip: Option<String>,
}

/// New row prepared before rotation. Owner and metadata are copied from the
/// row being rotated, inside the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementToken {
    pub id: RefreshTokenId,
    pub lookup_hash: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ReplacementToken {
    pub fn inherit(self, previous: &RefreshToken) -> RefreshToken {
        RefreshToken {
            id: self.id,
            user_id: previous.user_id,
            lookup_hash: self.lookup_hash,
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            created_at: self.created_at,
            revoked_at: None,
            device_info: previous.device_info.clone(),
            source_ip: previous.source_ip.clone(),
        }
    }
}

/// Result of one rotation attempt, as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    Rotated {
        previous: RefreshToken,
        current: RefreshToken,
    },
    Unknown,
    Expired,
    /// Already revoked: either rotated before or logged out.
    Revoked(RefreshToken),
    /// Lookup hash matched but the KDF hash did not.
    Mismatch,
}

/// Successful rotation handed back to the caller.
#[derive(Debug, Clone)]
pub struct RotatedSession {
    pub previous: RefreshToken,
    pub refresh_token: String,
}
