use async_trait::async_trait;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::CaptchaError;
use crate::domain::auth::errors::MailError;
use crate::domain::auth::models::AuthEvent;
use crate::domain::auth::models::AuthenticatedSession;
use crate::domain::auth::models::ClientContext;
use crate::domain::auth::models::LoginRequest;
use crate::domain::auth::models::PasswordResetConfirmation;
use crate::domain::auth::models::PasswordResetRequest;
use crate::domain::auth::models::Principal;
use crate::domain::auth::models::SignupRequest;
use crate::domain::token::models::TokenPurpose;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::UserId;

/// Port for credential and session flows.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a user and send the email-verification token.
    ///
    /// # Returns
    /// Id of the new user; no session is started
    ///
    /// # Errors
    /// * `RateLimited` - Too many signups from this client
    /// * `CaptchaRejected` - Captcha missing or rejected
    /// * `Validation` - Email, password or nick failed validation
    /// * `Conflict` - Email already registered
    async fn signup(&self, request: SignupRequest, client: &ClientContext)
        -> Result<UserId, AuthError>;

    /// Exchange email and password for an access and refresh token.
    ///
    /// # Errors
    /// * `RateLimited` - Too many attempts from this client
    /// * `CaptchaRejected` - Captcha missing or rejected
    /// * `Unauthorized` - Unknown email or wrong password (same message)
    /// * `Forbidden` - Account is banned
    /// * `EmailNotVerified` - Email not verified yet
    async fn login(
        &self,
        request: LoginRequest,
        client: &ClientContext,
    ) -> Result<AuthenticatedSession, AuthError>;

    /// Rotate a refresh token and mint a new access token.
    ///
    /// # Errors
    /// * `RateLimited` - Too many attempts from this client
    /// * `Unauthorized` - Unknown, expired, revoked or mismatching token
    /// * `Forbidden` - Account is banned; all its sessions are revoked
    async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientContext,
    ) -> Result<AuthenticatedSession, AuthError>;

    /// Revoke every session of the caller.
    async fn logout(&self, principal: &Principal) -> Result<(), AuthError>;

    /// Consume an email-verification token.
    ///
    /// # Errors
    /// * `InvalidToken` - Unknown, used or expired token
    async fn verify_email(&self, token: &str) -> Result<(), AuthError>;

    /// Send a fresh verification token if the account exists and is
    /// unverified. Succeeds either way.
    ///
    /// # Errors
    /// * `RateLimited` - Too many attempts from this client
    async fn resend_verification(&self, email: &str, client: &ClientContext)
        -> Result<(), AuthError>;

    /// Send a password-reset token if the account exists. Succeeds either way.
    ///
    /// # Errors
    /// * `RateLimited` - Too many attempts from this client
    /// * `CaptchaRejected` - Captcha missing or rejected
    async fn request_password_reset(
        &self,
        request: PasswordResetRequest,
        client: &ClientContext,
    ) -> Result<(), AuthError>;

    /// Set a new password with a reset token and end every session.
    ///
    /// # Errors
    /// * `Validation` - New password violates the policy
    /// * `InvalidToken` - Unknown, used or expired token
    async fn confirm_password_reset(
        &self,
        confirmation: PasswordResetConfirmation,
    ) -> Result<(), AuthError>;

    /// Verify an access token.
    ///
    /// # Errors
    /// * `Unauthorized` - Bad signature, wrong algorithm or expired
    async fn authenticate(&self, access_token: &str) -> Result<Principal, AuthError>;
}

/// Delivery of single-use tokens to the user.
#[async_trait]
pub trait MailSender: Send + Sync + 'static {
    async fn send(
        &self,
        to: &EmailAddress,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<(), MailError>;
}

/// Human check on anonymous endpoints. A boolean oracle.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync + 'static {
    /// # Returns
    /// True if the caller passed the challenge
    ///
    /// # Errors
    /// * `Unavailable` - Provider could not be reached
    async fn verify(&self, token: Option<&str>, remote_ip: &str) -> Result<bool, CaptchaError>;
}

/// Sink for flow outcomes (counters, audit).
pub trait AuthObserver: Send + Sync + 'static {
    fn record(&self, event: AuthEvent);
}
