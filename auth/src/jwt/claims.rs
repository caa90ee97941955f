use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Access token payload.
///
/// A signed, stateless assertion of identity and role. Nothing about it is
/// stored server-side; the short `exp` is the only revocation mechanism.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Numeric user identifier
    pub user_id: i64,

    /// Role name (participant, jury, moderator, admin, organizer)
    pub role: String,

    /// Display nickname
    pub nick: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Build claims valid from `issued_at` for `ttl`.
    pub fn new(
        user_id: i64,
        role: impl Into<String>,
        nick: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            user_id,
            role: role.into(),
            nick: nick.into(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// A token is valid strictly before `exp`.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        current_timestamp >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_expiry_from_ttl() {
        let issued_at = Utc::now();
        let claims = Claims::new(7, "jury", "Bob", issued_at, Duration::minutes(15));

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role, "jury");
        assert_eq!(claims.nick, "Bob");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_is_expired() {
        let claims = Claims {
            user_id: 1,
            role: "participant".to_string(),
            nick: "Alice".to_string(),
            iat: 900,
            exp: 1000,
        };

        assert!(!claims.is_expired(999));
        assert!(claims.is_expired(1000));
        assert!(claims.is_expired(1001));
    }
}
