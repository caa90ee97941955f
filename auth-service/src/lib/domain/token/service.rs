use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::token::errors::SingleUseTokenError;
use crate::domain::token::models::SingleUseToken;
use crate::domain::token::models::TokenEffect;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::SingleUseTokenRepository;
use crate::domain::user::models::UserId;

/// Lifetime of verification and reset tokens, in hours.
pub const SINGLE_USE_TOKEN_TTL_HOURS: i64 = 1;

/// Issues and consumes email-verification and password-reset tokens.
pub struct SingleUseTokenManager<TR>
where
    TR: SingleUseTokenRepository,
{
    repository: Arc<TR>,
    ttl: Duration,
}

impl<TR> SingleUseTokenManager<TR>
where
    TR: SingleUseTokenRepository,
{
    pub fn new(repository: Arc<TR>) -> Self {
        Self {
            repository,
            ttl: Duration::hours(SINGLE_USE_TOKEN_TTL_HOURS),
        }
    }

    /// Issue a fresh token, superseding any live token for the same purpose.
    ///
    /// # Arguments
    /// * `user_id` - Owner of the token
    /// * `purpose` - What the token will authorize
    /// * `now` - Issue instant
    ///
    /// # Returns
    /// Raw token to deliver to the user; only its hash is stored
    ///
    /// # Errors
    /// * `Generation` - OS random source unavailable
    /// * `DatabaseError` - Database operation failed
    pub async fn issue(
        &self,
        user_id: UserId,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<String, SingleUseTokenError> {
        let raw = auth::token::generate()?;

        self.repository
            .upsert(SingleUseToken {
                token_hash: auth::token::lookup_hash(&raw),
                user_id,
                purpose,
                expires_at: now + self.ttl,
                created_at: now,
            })
            .await?;

        tracing::debug!(user_id = %user_id, purpose = %purpose, "Single-use token issued");

        Ok(raw)
    }

    /// Consume an email-verification token and mark the owner verified.
    ///
    /// # Errors
    /// * `Invalid` - Unknown, consumed or expired token
    /// * `DatabaseError` - Database operation failed
    pub async fn consume_email_verification(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, SingleUseTokenError> {
        self.consume(raw, now, TokenEffect::MarkEmailVerified).await
    }

    /// Consume a password-reset token and store the new password hash.
    ///
    /// # Errors
    /// * `Invalid` - Unknown, consumed or expired token
    /// * `DatabaseError` - Database operation failed
    pub async fn consume_password_reset(
        &self,
        raw: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<UserId, SingleUseTokenError> {
        self.consume(raw, now, TokenEffect::SetPasswordHash(password_hash))
            .await
    }

    async fn consume(
        &self,
        raw: &str,
        now: DateTime<Utc>,
        effect: TokenEffect,
    ) -> Result<UserId, SingleUseTokenError> {
        let purpose = effect.purpose();
        let user_id = self
            .repository
            .consume(&auth::token::lookup_hash(raw), now, effect)
            .await?
            .ok_or(SingleUseTokenError::Invalid)?;

        tracing::debug!(user_id = %user_id, purpose = %purpose, "Single-use token consumed");

        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mockall::mock;

    use super::*;

    mock! {
        pub TestTokenRepository {}

        #[async_trait]
        impl SingleUseTokenRepository for TestTokenRepository {
            async fn upsert(&self, token: SingleUseToken) -> Result<(), SingleUseTokenError>;
            async fn consume(
                &self,
                token_hash: &str,
                now: DateTime<Utc>,
                effect: TokenEffect,
            ) -> Result<Option<UserId>, SingleUseTokenError>;
        }
    }

    #[tokio::test]
    async fn test_issue_stores_hash_with_one_hour_expiry() {
        let now = Utc::now();
        let mut repository = MockTestTokenRepository::new();

        repository
            .expect_upsert()
            .withf(move |token| {
                token.user_id == UserId(5)
                    && token.purpose == TokenPurpose::PasswordReset
                    && token.expires_at == now + Duration::hours(1)
                    && token.token_hash.len() == 64
            })
            .times(1)
            .returning(|_| Ok(()));

        let manager = SingleUseTokenManager::new(Arc::new(repository));
        let raw = manager
            .issue(UserId(5), TokenPurpose::PasswordReset, now)
            .await
            .unwrap();

        assert_eq!(raw.len(), 64);
    }

    #[tokio::test]
    async fn test_consume_looks_up_by_hash_and_applies_effect() {
        let mut repository = MockTestTokenRepository::new();

        repository
            .expect_consume()
            .withf(|hash, _, effect| {
                hash == auth::token::lookup_hash("raw-token")
                    && *effect == TokenEffect::SetPasswordHash("$argon2id$new".to_string())
            })
            .times(1)
            .returning(|_, _, _| Ok(Some(UserId(5))));

        let manager = SingleUseTokenManager::new(Arc::new(repository));
        let user_id = manager
            .consume_password_reset("raw-token", "$argon2id$new".to_string(), Utc::now())
            .await
            .unwrap();

        assert_eq!(user_id, UserId(5));
    }

    #[tokio::test]
    async fn test_consume_unknown_token_is_invalid() {
        let mut repository = MockTestTokenRepository::new();
        repository
            .expect_consume()
            .times(1)
            .returning(|_, _, _| Ok(None));

        let manager = SingleUseTokenManager::new(Arc::new(repository));
        let result = manager
            .consume_email_verification("missing", Utc::now())
            .await;

        assert!(matches!(result, Err(SingleUseTokenError::Invalid)));
    }
}
