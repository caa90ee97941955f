use std::fmt;
use std::time::Duration;

/// Brute-force-sensitive actions gated by the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Signup,
    Login,
    Refresh,
    PasswordReset,
    ResendVerification,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitAction::Signup => "signup",
            RateLimitAction::Login => "login",
            RateLimitAction::Refresh => "refresh",
            RateLimitAction::PasswordReset => "reset_password",
            RateLimitAction::ResendVerification => "resend_verification",
        }
    }

    /// Counter key for this action and client, `"{action}:{client}"`.
    pub fn key(&self, client: &str) -> String {
        format!("{}:{}", self.as_str(), client)
    }
}

impl fmt::Display for RateLimitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-window policy: at most `max_attempts` per `window` per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(RateLimitAction::Login.key("10.0.0.1"), "login:10.0.0.1");
        assert_eq!(
            RateLimitAction::PasswordReset.key("::1"),
            "reset_password:::1"
        );
    }
}
