use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;

use crate::user::errors::EmailError;
use crate::user::errors::NickError;
use crate::user::errors::PasswordPolicyError;
use crate::user::errors::RoleError;

/// User aggregate entity.
///
/// Identity record owned by the credential store. The password hash is
/// opaque and never leaves the domain: response types copy the other fields
/// explicitly.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub nick: Nick,
    pub password_hash: String,
    pub role: Role,
    pub email_verified: bool,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
}

/// Numeric user identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Normalized email address.
///
/// Trimmed and lowercased on construction so uniqueness is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalize an email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Not RFC 5322 syntax, or the domain has no dot
    pub fn new(email: String) -> Result<Self, EmailError> {
        let normalized = email.trim().to_lowercase();

        email_address::EmailAddress::from_str(&normalized)
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))?;

        match normalized.rsplit_once('@') {
            Some((_, domain)) if domain.contains('.') && !domain.ends_with('.') => {
                Ok(Self(normalized))
            }
            _ => Err(EmailError::InvalidFormat(
                "domain must contain a top-level domain".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Email with most of the local part hidden, for logs.
    pub fn masked(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) if local.chars().count() > 2 => {
                let prefix: String = local.chars().take(2).collect();
                format!("{prefix}***@{domain}")
            }
            Some((_, domain)) => format!("***@{domain}"),
            None => "***@***".to_string(),
        }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display nickname.
///
/// 2-50 characters, Latin or Cyrillic letters only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nick(String);

impl Nick {
    const MIN_LENGTH: usize = 2;
    const MAX_LENGTH: usize = 50;

    /// # Errors
    /// * `InvalidLength` - Fewer than 2 or more than 50 characters after trimming
    /// * `InvalidCharacters` - Anything other than Latin or Cyrillic letters
    pub fn new(nick: String) -> Result<Self, NickError> {
        let nick = nick.trim().to_string();
        let length = nick.chars().count();

        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&length) {
            return Err(NickError::InvalidLength {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }

        if nick.chars().all(Self::is_allowed) {
            Ok(Self(nick))
        } else {
            Err(NickError::InvalidCharacters)
        }
    }

    fn is_allowed(c: char) -> bool {
        c.is_ascii_alphabetic() || matches!(c, 'А'..='Я' | 'а'..='я' | 'Ё' | 'ё')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password accepted by the password policy.
///
/// Only ever lives for the duration of a request; it is hashed before
/// anything is stored.
pub struct NewPassword(String);

impl NewPassword {
    const MIN_LENGTH: usize = 6;
    const MAX_LENGTH: usize = 20;
    const SPECIAL_CHARACTERS: &'static str = "!\"#$%&'()*+,./:;<=>?@[\\]^_{}-";

    /// Check a password and its confirmation against the policy.
    ///
    /// # Errors
    /// * `InvalidLength` - Outside 6-20 characters
    /// * `InvalidCharacters` - Characters outside the allowed set
    /// * `ConfirmationMismatch` - Confirmation differs from the password
    pub fn new(password: String, confirmation: &str) -> Result<Self, PasswordPolicyError> {
        let length = password.chars().count();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&length) {
            return Err(PasswordPolicyError::InvalidLength {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }

        if !password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || Self::SPECIAL_CHARACTERS.contains(c))
        {
            return Err(PasswordPolicyError::InvalidCharacters);
        }

        if password != confirmation {
            return Err(PasswordPolicyError::ConfirmationMismatch);
        }

        Ok(Self(password))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NewPassword(***)")
    }
}

/// Account role carried in access token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Participant,
    Jury,
    Moderator,
    Admin,
    Organizer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Participant => "participant",
            Role::Jury => "jury",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::Organizer => "organizer",
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participant" => Ok(Role::Participant),
            "jury" => Ok(Role::Jury),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            "organizer" => Ok(Role::Organizer),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data needed to insert a user; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: EmailAddress,
    pub nick: Nick,
    pub password_hash: String,
}
