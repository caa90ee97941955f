use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is invalid: {0}")]
    InvalidToken(String),

    #[error("Token algorithm does not match the server algorithm")]
    AlgorithmMismatch,

    #[error("Token is expired")]
    TokenExpired,
}
