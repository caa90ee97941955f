use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::ReplacementToken;
use crate::domain::session::models::RotatedSession;
use crate::domain::session::models::RotationOutcome;
use crate::domain::session::models::SessionMetadata;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::ports::TokenHashCheck;
use crate::domain::user::models::UserId;

/// Refresh token lifecycle settings.
#[derive(Debug, Clone, Copy)]
pub struct RotatorSettings {
    pub ttl: Duration,
    /// Revoke every session of a user when one of their revoked tokens is
    /// presented again.
    pub revoke_on_reuse: bool,
}

impl Default for RotatorSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::days(30),
            revoke_on_reuse: false,
        }
    }
}

/// Issues, validates and rotates opaque refresh tokens.
///
/// Session state machine: ACTIVE -> ROTATED | REVOKED, both terminal.
pub struct RefreshTokenRotator<RR>
where
    RR: RefreshTokenRepository,
{
    repository: Arc<RR>,
    hasher: auth::PasswordHasher,
    settings: RotatorSettings,
}

/// Raw token plus its two stored hashes.
struct MintedToken {
    raw: String,
    lookup_hash: String,
    token_hash: String,
}

impl<RR> RefreshTokenRotator<RR>
where
    RR: RefreshTokenRepository,
{
    pub fn new(repository: Arc<RR>, settings: RotatorSettings) -> Self {
        Self {
            repository,
            hasher: auth::PasswordHasher::new(),
            settings,
        }
    }

    async fn mint(&self) -> Result<MintedToken, SessionError> {
        let raw = auth::token::generate()?;
        let lookup_hash = auth::token::lookup_hash(&raw);

        let hasher = self.hasher;
        let secret = raw.clone();
        let token_hash = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| SessionError::Unknown(format!("Hashing task failed: {}", e)))??;

        Ok(MintedToken {
            raw,
            lookup_hash,
            token_hash,
        })
    }

    /// Start a new session.
    ///
    /// # Arguments
    /// * `user_id` - Session owner
    /// * `metadata` - Device and source address of the client
    /// * `now` - Issue instant
    ///
    /// # Returns
    /// Raw refresh token; only its hashes are stored
    ///
    /// # Errors
    /// * `Generation` - OS random source unavailable
    /// * `Hashing` - KDF failed
    /// * `DatabaseError` - Database operation failed
    pub async fn issue(
        &self,
        user_id: UserId,
        metadata: SessionMetadata,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let minted = self.mint().await?;
        let id = RefreshTokenId::new();

        self.repository
            .insert(RefreshToken {
                id,
                user_id,
                lookup_hash: minted.lookup_hash,
                token_hash: minted.token_hash,
                expires_at: now + self.settings.ttl,
                created_at: now,
                revoked_at: None,
                device_info: metadata.device_info,
                source_ip: metadata.source_ip,
            })
            .await?;

        tracing::debug!(user_id = %user_id, session_id = %id, "Refresh token issued");

        Ok(minted.raw)
    }

    /// Owner of the session a raw token points at, without changing it.
    ///
    /// Revoked and expired rows still resolve; `validate_and_rotate` decides
    /// whether the token is usable.
    ///
    /// # Errors
    /// * `Unauthorized` - No session has this token
    /// * `DatabaseError` - Database operation failed
    pub async fn owner(&self, raw: &str) -> Result<UserId, SessionError> {
        self.repository
            .find_by_lookup(&auth::token::lookup_hash(raw))
            .await?
            .map(|token| token.user_id)
            .ok_or(SessionError::Unauthorized)
    }

    /// Exchange a refresh token for a new one.
    ///
    /// # Returns
    /// The consumed session and the raw replacement token
    ///
    /// # Errors
    /// * `Unauthorized` - Unknown, expired or mismatching token
    /// * `Reused` - Token was already revoked
    /// * `DatabaseError` - Database operation failed (nothing changed)
    pub async fn validate_and_rotate(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<RotatedSession, SessionError> {
        let minted = self.mint().await?;
        let replacement = ReplacementToken {
            id: RefreshTokenId::new(),
            lookup_hash: minted.lookup_hash,
            token_hash: minted.token_hash,
            expires_at: now + self.settings.ttl,
            created_at: now,
        };

        let hasher = self.hasher;
        let presented = raw.to_string();
        let check: TokenHashCheck =
            Arc::new(move |stored: &str| hasher.verify(&presented, stored).unwrap_or(false));

        let outcome = self
            .repository
            .rotate(&auth::token::lookup_hash(raw), replacement, now, check)
            .await?;

        match outcome {
            RotationOutcome::Rotated { previous, current } => {
                tracing::debug!(
                    user_id = %previous.user_id,
                    previous_session = %previous.id,
                    session_id = %current.id,
                    "Refresh token rotated"
                );
                Ok(RotatedSession {
                    previous,
                    refresh_token: minted.raw,
                })
            }
            RotationOutcome::Revoked(previous) => {
                tracing::warn!(
                    user_id = %previous.user_id,
                    session_id = %previous.id,
                    source_ip = previous.source_ip.as_deref().unwrap_or("-"),
                    "Revoked refresh token presented again"
                );
                if self.settings.revoke_on_reuse {
                    let revoked = self.repository.revoke_all(previous.user_id, now).await?;
                    tracing::warn!(
                        user_id = %previous.user_id,
                        revoked,
                        "Revoked all sessions after refresh token reuse"
                    );
                }
                Err(SessionError::Reused(previous.user_id))
            }
            RotationOutcome::Unknown | RotationOutcome::Expired | RotationOutcome::Mismatch => {
                Err(SessionError::Unauthorized)
            }
        }
    }

    /// Revoke every active session of a user.
    ///
    /// # Returns
    /// Number of sessions revoked
    pub async fn revoke_all(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        let revoked = self.repository.revoke_all(user_id, now).await?;
        tracing::debug!(user_id = %user_id, revoked, "Sessions revoked");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::outbound::memory::InMemoryStore;

    mock! {
        pub TestRefreshTokenRepository {}

        #[async_trait]
        impl RefreshTokenRepository for TestRefreshTokenRepository {
            async fn insert(&self, token: RefreshToken) -> Result<(), SessionError>;
            async fn find_by_lookup(
                &self,
                lookup_hash: &str,
            ) -> Result<Option<RefreshToken>, SessionError>;
            async fn rotate(
                &self,
                lookup_hash: &str,
                replacement: ReplacementToken,
                now: DateTime<Utc>,
                check: TokenHashCheck,
            ) -> Result<RotationOutcome, SessionError>;
            async fn revoke_all(
                &self,
                user_id: UserId,
                now: DateTime<Utc>,
            ) -> Result<u64, SessionError>;
        }
    }

    fn rotator(
        store: Arc<InMemoryStore>,
        revoke_on_reuse: bool,
    ) -> RefreshTokenRotator<InMemoryStore> {
        RefreshTokenRotator::new(
            store,
            RotatorSettings {
                ttl: Duration::days(7),
                revoke_on_reuse,
            },
        )
    }

    fn metadata() -> SessionMetadata {
        SessionMetadata {
            device_info: Some("test-agent".to_string()),
            source_ip: Some("10.0.0.1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_rotation_inherits_metadata_and_invalidates_old_token() {
        let store = Arc::new(InMemoryStore::new());
        let rotator = rotator(store.clone(), false);
        let now = Utc::now();

        let first = rotator.issue(UserId(1), metadata(), now).await.unwrap();
        let rotated = rotator.validate_and_rotate(&first, now).await.unwrap();

        assert_eq!(rotated.previous.user_id, UserId(1));
        assert_ne!(rotated.refresh_token, first);

        let current = store
            .refresh_token_by_lookup(&auth::token::lookup_hash(&rotated.refresh_token))
            .await
            .unwrap();
        assert_eq!(current.device_info.as_deref(), Some("test-agent"));
        assert_eq!(current.source_ip.as_deref(), Some("10.0.0.1"));

        let replay = rotator.validate_and_rotate(&first, now).await;
        assert!(matches!(replay, Err(SessionError::Reused(UserId(1)))));

        assert!(rotator
            .validate_and_rotate(&rotated.refresh_token, now)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_expired_tokens_are_unauthorized() {
        let store = Arc::new(InMemoryStore::new());
        let rotator = rotator(store, false);
        let now = Utc::now();

        let unknown = rotator.validate_and_rotate("deadbeef", now).await;
        assert!(matches!(unknown, Err(SessionError::Unauthorized)));

        let token = rotator.issue(UserId(1), metadata(), now).await.unwrap();
        let later = now + Duration::days(7);
        let expired = rotator.validate_and_rotate(&token, later).await;
        assert!(matches!(expired, Err(SessionError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_concurrent_rotation_has_single_winner() {
        let store = Arc::new(InMemoryStore::new());
        let rotator = Arc::new(rotator(store, false));
        let now = Utc::now();

        let token = rotator.issue(UserId(1), metadata(), now).await.unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let rotator = rotator.clone();
                let token = token.clone();
                tokio::spawn(async move { rotator.validate_and_rotate(&token, now).await })
            })
            .collect();

        let mut successes = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_serialized_store_lets_one_rotation_through() {
        let raw = "a".repeat(64);
        let now = Utc::now();
        let row = RefreshToken {
            id: RefreshTokenId::new(),
            user_id: UserId(1),
            lookup_hash: auth::token::lookup_hash(&raw),
            token_hash: auth::PasswordHasher::new().hash(&raw).unwrap(),
            expires_at: now + Duration::days(7),
            created_at: now,
            revoked_at: None,
            device_info: None,
            source_ip: None,
        };

        // One row behind a lock, like `SELECT ... FOR UPDATE`.
        let stored = Arc::new(Mutex::new(row));
        let mut repository = MockTestRefreshTokenRepository::new();
        repository
            .expect_rotate()
            .times(8)
            .returning(move |lookup_hash, replacement, now, check| {
                let mut row = stored.lock().unwrap();
                if row.lookup_hash != lookup_hash {
                    return Ok(RotationOutcome::Unknown);
                }
                if row.is_revoked() {
                    return Ok(RotationOutcome::Revoked(row.clone()));
                }
                if !check(&row.token_hash) {
                    return Ok(RotationOutcome::Mismatch);
                }
                let previous = row.clone();
                row.revoked_at = Some(now);
                Ok(RotationOutcome::Rotated {
                    current: replacement.inherit(&previous),
                    previous,
                })
            });
        repository.expect_revoke_all().never();

        let rotator = Arc::new(RefreshTokenRotator::new(
            Arc::new(repository),
            RotatorSettings::default(),
        ));

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let rotator = rotator.clone();
                let raw = raw.clone();
                tokio::spawn(async move { rotator.validate_and_rotate(&raw, now).await })
            })
            .collect();

        let mut winners = 0;
        let mut reused = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(rotated) => {
                    assert_eq!(rotated.previous.user_id, UserId(1));
                    winners += 1;
                }
                Err(SessionError::Reused(UserId(1))) => reused += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(reused, 7);
    }

    #[tokio::test]
    async fn test_owner_resolves_any_known_token() {
        let store = Arc::new(InMemoryStore::new());
        let rotator = rotator(store, false);
        let now = Utc::now();

        let first = rotator.issue(UserId(3), metadata(), now).await.unwrap();
        rotator.validate_and_rotate(&first, now).await.unwrap();

        assert_eq!(rotator.owner(&first).await.unwrap(), UserId(3));
        assert!(matches!(
            rotator.owner("deadbeef").await,
            Err(SessionError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_revoke_all_ends_every_session() {
        let store = Arc::new(InMemoryStore::new());
        let rotator = rotator(store, false);
        let now = Utc::now();

        let a = rotator.issue(UserId(1), metadata(), now).await.unwrap();
        let b = rotator.issue(UserId(1), metadata(), now).await.unwrap();
        let other = rotator.issue(UserId(2), metadata(), now).await.unwrap();

        assert_eq!(rotator.revoke_all(UserId(1), now).await.unwrap(), 2);

        assert!(rotator.validate_and_rotate(&a, now).await.is_err());
        assert!(rotator.validate_and_rotate(&b, now).await.is_err());
        assert!(rotator.validate_and_rotate(&other, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_reuse_revokes_family_when_enabled() {
        let store = Arc::new(InMemoryStore::new());
        let rotator = rotator(store, true);
        let now = Utc::now();

        let first = rotator.issue(UserId(1), metadata(), now).await.unwrap();
        let rotated = rotator.validate_and_rotate(&first, now).await.unwrap();

        let replay = rotator.validate_and_rotate(&first, now).await;
        assert!(matches!(replay, Err(SessionError::Reused(_))));

        let legit = rotator
            .validate_and_rotate(&rotated.refresh_token, now)
            .await;
        assert!(matches!(legit, Err(SessionError::Reused(_))));
    }
}
