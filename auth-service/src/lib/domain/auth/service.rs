use std::sync::Arc;

use async_trait::async_trait;
use auth::TokenIssuer;
use chrono::Duration;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::INVALID_TOKEN;
use crate::domain::auth::models::AuthEvent;
use crate::domain::auth::models::AuthenticatedSession;
use crate::domain::auth::models::ClientContext;
use crate::domain::auth::models::LoginRequest;
use crate::domain::auth::models::PasswordResetConfirmation;
use crate::domain::auth::models::PasswordResetRequest;
use crate::domain::auth::models::Principal;
use crate::domain::auth::models::SignupRequest;
use crate::domain::auth::ports::AuthObserver;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::auth::ports::CaptchaVerifier;
use crate::domain::auth::ports::MailSender;
use crate::domain::clock::Clock;
use crate::domain::rate_limit::errors::RateLimitError;
use crate::domain::rate_limit::models::RateLimitAction;
use crate::domain::rate_limit::models::RateLimitPolicy;
use crate::domain::rate_limit::ports::RateLimiter;
use crate::domain::rate_limit::service::RateLimitGate;
use crate::domain::session::errors::SessionError;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::service::RefreshTokenRotator;
use crate::domain::session::service::RotatorSettings;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::SingleUseTokenRepository;
use crate::domain::token::service::SingleUseTokenManager;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewPassword;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::domain::user::service::CredentialStore;
use crate::user::errors::UserError;

/// Tunables of the credential and session flows.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub access_ttl: Duration,
    pub sessions: RotatorSettings,
    pub rate_limit: RateLimitPolicy,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            sessions: RotatorSettings::default(),
            rate_limit: RateLimitPolicy::default(),
        }
    }
}

/// Side-effecting capabilities injected into the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    pub mail: Arc<dyn MailSender>,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub observer: Arc<dyn AuthObserver>,
    pub clock: Arc<dyn Clock>,
}

/// Session orchestrator.
///
/// Composes the credential store, single-use tokens, refresh rotation,
/// rate limiting and the access token issuer into the public flows, and
/// owns the order in which their checks run.
pub struct AuthService<UR, TR, RR, RL>
where
    UR: UserRepository,
    TR: SingleUseTokenRepository,
    RR: RefreshTokenRepository,
    RL: RateLimiter,
{
    credentials: CredentialStore<UR>,
    single_use_tokens: SingleUseTokenManager<TR>,
    sessions: RefreshTokenRotator<RR>,
    rate_limit: RateLimitGate<RL>,
    issuer: Arc<TokenIssuer>,
    access_ttl: Duration,
    collaborators: Collaborators,
}

impl<UR, TR, RR, RL> AuthService<UR, TR, RR, RL>
where
    UR: UserRepository,
    TR: SingleUseTokenRepository,
    RR: RefreshTokenRepository,
    RL: RateLimiter,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `users` - User persistence
    /// * `single_use_tokens` - Verification and reset token persistence
    /// * `refresh_tokens` - Session persistence
    /// * `limiter` - Fixed-window counter store
    /// * `issuer` - Access token signer
    /// * `settings` - TTLs and policies
    /// * `collaborators` - Mail, captcha, observer and clock
    pub fn new(
        users: Arc<UR>,
        single_use_tokens: Arc<TR>,
        refresh_tokens: Arc<RR>,
        limiter: Arc<RL>,
        issuer: Arc<TokenIssuer>,
        settings: AuthSettings,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(users),
            single_use_tokens: SingleUseTokenManager::new(single_use_tokens),
            sessions: RefreshTokenRotator::new(refresh_tokens, settings.sessions),
            rate_limit: RateLimitGate::new(limiter, settings.rate_limit),
            issuer,
            access_ttl: settings.access_ttl,
            collaborators,
        }
    }

    pub fn credentials(&self) -> &CredentialStore<UR> {
        &self.credentials
    }

    fn record(&self, event: AuthEvent) {
        self.collaborators.observer.record(event);
    }

    async fn throttle(
        &self,
        action: RateLimitAction,
        client: &ClientContext,
    ) -> Result<(), AuthError> {
        self.rate_limit
            .check(action, &client.ip)
            .await
            .map_err(|err| {
                if matches!(err, RateLimitError::Exceeded { .. }) {
                    self.record(AuthEvent::RateLimited { action });
                }
                AuthError::from(err)
            })
    }

    async fn check_captcha(
        &self,
        token: Option<&str>,
        client: &ClientContext,
    ) -> Result<(), AuthError> {
        if self.collaborators.captcha.verify(token, &client.ip).await? {
            Ok(())
        } else {
            self.record(AuthEvent::CaptchaRejected);
            Err(AuthError::CaptchaRejected)
        }
    }

    fn issue_access_token(&self, user: &User) -> Result<String, AuthError> {
        Ok(self.issuer.sign(
            user.id.0,
            user.role.as_str(),
            user.nick.as_str(),
            self.access_ttl,
            self.collaborators.clock.now(),
        )?)
    }

    /// Issue a single-use token and mail it. Delivery failures are logged
    /// only; the user can ask for another token.
    async fn send_single_use_token(
        &self,
        user: &User,
        purpose: TokenPurpose,
    ) -> Result<(), AuthError> {
        let token = self
            .single_use_tokens
            .issue(user.id, purpose, self.collaborators.clock.now())
            .await?;

        if let Err(e) = self.collaborators.mail.send(&user.email, purpose, &token).await {
            tracing::error!(
                user_id = %user.id,
                email = %user.email.masked(),
                purpose = %purpose,
                error = %e,
                "Failed to send token mail"
            );
        }

        Ok(())
    }

    /// Look up an account by a raw email without revealing whether it exists.
    async fn find_account(&self, email: &str) -> Result<Option<User>, AuthError> {
        let Ok(email) = EmailAddress::new(email.to_string()) else {
            return Ok(None);
        };

        match self.credentials.get_by_email(&email).await {
            Ok(user) => Ok(Some(user)),
            Err(UserError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl<UR, TR, RR, RL> AuthServicePort for AuthService<UR, TR, RR, RL>
where
    UR: UserRepository,
    TR: SingleUseTokenRepository,
    RR: RefreshTokenRepository,
    RL: RateLimiter,
{
    async fn signup(
        &self,
        request: SignupRequest,
        client: &ClientContext,
    ) -> Result<UserId, AuthError> {
        self.throttle(RateLimitAction::Signup, client).await?;
        self.check_captcha(request.captcha_token.as_deref(), client)
            .await?;

        let command = request.validate()?;
        let password_hash = self
            .credentials
            .hash_password(command.password.as_str())
            .await?;

        let user = self
            .credentials
            .create_user(command.email, command.nick, password_hash)
            .await?;

        self.send_single_use_token(&user, TokenPurpose::EmailVerification)
            .await?;

        self.record(AuthEvent::SignupSucceeded { user_id: user.id });

        Ok(user.id)
    }

    async fn login(
        &self,
        request: LoginRequest,
        client: &ClientContext,
    ) -> Result<AuthenticatedSession, AuthError> {
        self.throttle(RateLimitAction::Login, client).await?;
        self.check_captcha(request.captcha_token.as_deref(), client)
            .await?;

        let Ok(email) = EmailAddress::new(request.email) else {
            self.record(AuthEvent::LoginFailed);
            return Err(AuthError::invalid_credentials());
        };

        let user = match self
            .credentials
            .verify_credentials(&email, &request.password)
            .await
        {
            Ok(user) => user,
            Err(UserError::InvalidCredentials) => {
                tracing::info!(email = %email.masked(), ip = %client.ip, "Login failed");
                self.record(AuthEvent::LoginFailed);
                return Err(AuthError::invalid_credentials());
            }
            Err(e) => return Err(e.into()),
        };

        if user.banned {
            tracing::info!(user_id = %user.id, "Login rejected for banned user");
            return Err(AuthError::Forbidden("Account is banned".to_string()));
        }

        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let access_token = self.issue_access_token(&user)?;
        let refresh_token = self
            .sessions
            .issue(
                user.id,
                client.session_metadata(),
                self.collaborators.clock.now(),
            )
            .await?;

        tracing::info!(user_id = %user.id, ip = %client.ip, "User logged in");
        self.record(AuthEvent::LoginSucceeded { user_id: user.id });

        Ok(AuthenticatedSession {
            user,
            access_token,
            refresh_token,
        })
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientContext,
    ) -> Result<AuthenticatedSession, AuthError> {
        self.throttle(RateLimitAction::Refresh, client).await?;

        let now = self.collaborators.clock.now();

        // The owner is loaded and checked before anything is committed, so a
        // failure here leaves the presented token usable.
        let owner = match self.sessions.owner(refresh_token).await {
            Ok(owner) => owner,
            Err(e @ SessionError::Unauthorized) => {
                self.record(AuthEvent::RefreshFailed);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let user = self.credentials.get_by_id(owner).await?;

        if user.banned {
            self.sessions.revoke_all(user.id, now).await?;
            tracing::info!(
                user_id = %user.id,
                "Refresh rejected for banned user; sessions revoked"
            );
            return Err(AuthError::Forbidden("Account is banned".to_string()));
        }

        let rotated = match self.sessions.validate_and_rotate(refresh_token, now).await {
            Ok(rotated) => rotated,
            Err(SessionError::Reused(user_id)) => {
                self.record(AuthEvent::RefreshTokenReuse { user_id });
                return Err(SessionError::Reused(user_id).into());
            }
            Err(e @ SessionError::Unauthorized) => {
                self.record(AuthEvent::RefreshFailed);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let access_token = self.issue_access_token(&user)?;
        self.record(AuthEvent::RefreshSucceeded { user_id: user.id });

        Ok(AuthenticatedSession {
            user,
            access_token,
            refresh_token: rotated.refresh_token,
        })
    }

    async fn logout(&self, principal: &Principal) -> Result<(), AuthError> {
        let revoked = self
            .sessions
            .revoke_all(principal.user_id, self.collaborators.clock.now())
            .await?;

        tracing::info!(user_id = %principal.user_id, revoked, "User logged out");
        self.record(AuthEvent::LoggedOut {
            user_id: principal.user_id,
        });

        Ok(())
    }

    async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let user_id = self
            .single_use_tokens
            .consume_email_verification(token, self.collaborators.clock.now())
            .await?;

        tracing::info!(user_id = %user_id, "Email verified");
        self.record(AuthEvent::EmailVerified { user_id });

        Ok(())
    }

    async fn resend_verification(
        &self,
        email: &str,
        client: &ClientContext,
    ) -> Result<(), AuthError> {
        self.throttle(RateLimitAction::ResendVerification, client)
            .await?;

        match self.find_account(email).await? {
            Some(user) if !user.email_verified => {
                self.send_single_use_token(&user, TokenPurpose::EmailVerification)
                    .await
            }
            _ => Ok(()),
        }
    }

    async fn request_password_reset(
        &self,
        request: PasswordResetRequest,
        client: &ClientContext,
    ) -> Result<(), AuthError> {
        self.throttle(RateLimitAction::PasswordReset, client).await?;
        self.check_captcha(request.captcha_token.as_deref(), client)
            .await?;

        self.record(AuthEvent::PasswordResetRequested);

        match self.find_account(&request.email).await? {
            Some(user) => {
                self.send_single_use_token(&user, TokenPurpose::PasswordReset)
                    .await
            }
            None => Ok(()),
        }
    }

    async fn confirm_password_reset(
        &self,
        confirmation: PasswordResetConfirmation,
    ) -> Result<(), AuthError> {
        let password = NewPassword::new(confirmation.password, &confirmation.confirm_password)
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        let password_hash = self.credentials.hash_password(password.as_str()).await?;

        let now = self.collaborators.clock.now();
        let user_id = self
            .single_use_tokens
            .consume_password_reset(&confirmation.token, password_hash, now)
            .await?;

        let revoked = self.sessions.revoke_all(user_id, now).await?;

        tracing::info!(user_id = %user_id, revoked, "Password reset completed");
        self.record(AuthEvent::PasswordResetCompleted { user_id });

        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<Principal, AuthError> {
        let claims = self
            .issuer
            .verify(access_token, self.collaborators.clock.now())?;

        let role = claims.role.parse().map_err(|e| {
            tracing::warn!(user_id = claims.user_id, error = %e, "Access token with unknown role");
            AuthError::Unauthorized(INVALID_TOKEN.to_string())
        })?;

        Ok(Principal {
            user_id: UserId(claims.user_id),
            role,
            nick: claims.nick,
        })
    }
}
