use std::time::Duration;

use thiserror::Error;

use crate::domain::rate_limit::errors::RateLimitError;
use crate::domain::session::errors::SessionError;
use crate::domain::token::errors::SingleUseTokenError;
use crate::user::errors::UserError;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const INVALID_TOKEN: &str = "Invalid or expired token";

/// Error for mail delivery
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Error for captcha verification
#[derive(Debug, Clone, Error)]
pub enum CaptchaError {
    #[error("Captcha provider unavailable: {0}")]
    Unavailable(String),
}

/// Outcome taxonomy of every credential and session flow.
///
/// Store failures collapse into `Internal`; their detail is for logs only.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Email is not verified")]
    EmailNotVerified,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited { retry_after: Duration },

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Captcha verification failed")]
    CaptchaRejected,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_credentials() -> Self {
        AuthError::Unauthorized(INVALID_CREDENTIALS.to_string())
    }
}

impl From<UserError> for AuthError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::EmailAlreadyExists(_) => {
                AuthError::Conflict("Email is already registered".to_string())
            }
            UserError::InvalidCredentials => AuthError::invalid_credentials(),
            UserError::InvalidEmail(_) | UserError::InvalidNick(_) => {
                AuthError::Validation(err.to_string())
            }
            UserError::NotFound(_) => AuthError::invalid_credentials(),
            UserError::InvalidRole(_)
            | UserError::Password(_)
            | UserError::DatabaseError(_)
            | UserError::Unknown(_) => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<SingleUseTokenError> for AuthError {
    fn from(err: SingleUseTokenError) -> Self {
        match err {
            SingleUseTokenError::Invalid => AuthError::InvalidToken,
            SingleUseTokenError::Generation(_) | SingleUseTokenError::DatabaseError(_) => {
                AuthError::Internal(err.to_string())
            }
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthorized | SessionError::Reused(_) => {
                AuthError::Unauthorized("Invalid refresh token".to_string())
            }
            SessionError::Generation(_)
            | SessionError::Hashing(_)
            | SessionError::DatabaseError(_)
            | SessionError::Unknown(_) => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<RateLimitError> for AuthError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Exceeded { retry_after } => AuthError::RateLimited { retry_after },
            RateLimitError::StoreError(_) => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<CaptchaError> for AuthError {
    fn from(err: CaptchaError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<auth::JwtError> for AuthError {
    fn from(err: auth::JwtError) -> Self {
        match err {
            auth::JwtError::EncodingFailed(_) => AuthError::Internal(err.to_string()),
            auth::JwtError::InvalidToken(_)
            | auth::JwtError::AlgorithmMismatch
            | auth::JwtError::TokenExpired => AuthError::Unauthorized(INVALID_TOKEN.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_failures_are_indistinguishable() {
        use crate::domain::user::models::UserId;

        let unauthorized = AuthError::from(SessionError::Unauthorized).to_string();
        let reused = AuthError::from(SessionError::Reused(UserId(1))).to_string();
        assert_eq!(unauthorized, reused);
    }

    #[test]
    fn test_missing_user_reads_as_bad_credentials() {
        let err = AuthError::from(UserError::NotFound("42".to_string()));

        assert!(matches!(err, AuthError::Unauthorized(_)));
        assert_eq!(err.to_string(), AuthError::invalid_credentials().to_string());
        assert!(!err.to_string().contains("42"));
    }

    #[test]
    fn test_store_detail_is_internal() {
        let err = AuthError::from(UserError::DatabaseError("connection reset".to_string()));
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
