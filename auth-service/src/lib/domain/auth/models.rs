use crate::domain::auth::errors::AuthError;
use crate::domain::rate_limit::models::RateLimitAction;
use crate::domain::session::models::SessionMetadata;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewPassword;
use crate::domain::user::models::Nick;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Where a request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub ip: String,
    pub device_info: Option<String>,
}

impl ClientContext {
    pub fn session_metadata(&self) -> SessionMetadata {
        SessionMetadata {
            device_info: self.device_info.clone(),
            source_ip: Some(self.ip.clone()),
        }
    }
}

/// Authenticated caller, derived from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub nick: String,
}

/// Unvalidated signup input.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub nick: String,
    pub captcha_token: Option<String>,
}

/// Signup input that passed every field rule.
#[derive(Debug)]
pub struct SignupCommand {
    pub email: EmailAddress,
    pub nick: Nick,
    pub password: NewPassword,
}

impl SignupRequest {
    /// Validate every field, reporting all failing fields at once.
    ///
    /// # Errors
    /// * `Validation` - One message per failing field, joined with "; "
    pub fn validate(self) -> Result<SignupCommand, AuthError> {
        let mut errors = Vec::new();

        let email = EmailAddress::new(self.email)
            .map_err(|e| errors.push(e.to_string()))
            .ok();
        let password = NewPassword::new(self.password, &self.confirm_password)
            .map_err(|e| errors.push(e.to_string()))
            .ok();
        let nick = Nick::new(self.nick)
            .map_err(|e| errors.push(e.to_string()))
            .ok();

        match (email, password, nick) {
            (Some(email), Some(password), Some(nick)) => Ok(SignupCommand {
                email,
                nick,
                password,
            }),
            _ => Err(AuthError::Validation(errors.join("; "))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PasswordResetRequest {
    pub email: String,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PasswordResetConfirmation {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Tokens handed out by login and refresh.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Countable outcomes reported to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignupSucceeded { user_id: UserId },
    LoginSucceeded { user_id: UserId },
    LoginFailed,
    RefreshSucceeded { user_id: UserId },
    RefreshFailed,
    RefreshTokenReuse { user_id: UserId },
    LoggedOut { user_id: UserId },
    EmailVerified { user_id: UserId },
    PasswordResetRequested,
    PasswordResetCompleted { user_id: UserId },
    RateLimited { action: RateLimitAction },
    CaptchaRejected,
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::SignupSucceeded { .. } => "signup_succeeded",
            AuthEvent::LoginSucceeded { .. } => "login_succeeded",
            AuthEvent::LoginFailed => "login_failed",
            AuthEvent::RefreshSucceeded { .. } => "refresh_succeeded",
            AuthEvent::RefreshFailed => "refresh_failed",
            AuthEvent::RefreshTokenReuse { .. } => "refresh_token_reuse",
            AuthEvent::LoggedOut { .. } => "logged_out",
            AuthEvent::EmailVerified { .. } => "email_verified",
            AuthEvent::PasswordResetRequested => "password_reset_requested",
            AuthEvent::PasswordResetCompleted { .. } => "password_reset_completed",
            AuthEvent::RateLimited { .. } => "rate_limited",
            AuthEvent::CaptchaRejected => "captcha_rejected",
        }
    }
}
