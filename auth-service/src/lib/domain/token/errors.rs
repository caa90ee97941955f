use thiserror::Error;

/// Error for single-use token operations
#[derive(Debug, Clone, Error)]
pub enum SingleUseTokenError {
    /// Unknown, already consumed or expired. Deliberately one variant.
    #[error("Invalid or expired token")]
    Invalid,

    #[error("Token generation failed: {0}")]
    Generation(#[from] auth::TokenError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
