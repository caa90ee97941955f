use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;

use crate::domain::user::models::UserId;

/// What a single-use token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

impl FromStr for TokenPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(TokenPurpose::EmailVerification),
            "password_reset" => Ok(TokenPurpose::PasswordReset),
            other => Err(format!("unknown token purpose: {other}")),
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User mutation applied in the same transaction that consumes a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEffect {
    MarkEmailVerified,
    SetPasswordHash(String),
}

impl TokenEffect {
    pub fn purpose(&self) -> TokenPurpose {
        match self {
            TokenEffect::MarkEmailVerified => TokenPurpose::EmailVerification,
            TokenEffect::SetPasswordHash(_) => TokenPurpose::PasswordReset,
        }
    }
}

/// Stored form of a single-use token. Only the SHA-256 of the raw token is
/// kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleUseToken {
    pub token_hash: String,
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
