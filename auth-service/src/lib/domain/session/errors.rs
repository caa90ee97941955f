use thiserror::Error;

use crate::domain::user::models::UserId;

/// Error for refresh token operations
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Unknown, expired, revoked or mismatching token.
    #[error("Invalid refresh token")]
    Unauthorized,

    /// A revoked token was presented again.
    #[error("Refresh token reuse detected for user {0}")]
    Reused(UserId),

    #[error("Token generation failed: {0}")]
    Generation(#[from] auth::TokenError),

    #[error("Token hashing failed: {0}")]
    Hashing(#[from] auth::PasswordError),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
