//! In-process store for users, single-use tokens and refresh tokens.
//!
//! Backs the integration tests and local runs without PostgreSQL. Every
//! operation runs under one mutex, which gives the same atomicity as the
//! transactional adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::ReplacementToken;
use crate::domain::session::models::RotationOutcome;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::ports::TokenHashCheck;
use crate::domain::token::errors::SingleUseTokenError;
use crate::domain::token::models::SingleUseToken;
use crate::domain::token::models::TokenEffect;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::SingleUseTokenRepository;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::Role;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

#[derive(Default)]
struct State {
    next_user_id: i64,
    users: HashMap<UserId, User>,
    single_use_tokens: HashMap<(UserId, TokenPurpose), SingleUseToken>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

impl State {
    fn user_mut(&mut self, id: UserId) -> Result<&mut User, UserError> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| UserError::NotFound(id.to_string()))
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session row by lookup hash, revoked or not.
    pub async fn refresh_token_by_lookup(&self, lookup_hash: &str) -> Option<RefreshToken> {
        self.state
            .lock()
            .await
            .refresh_tokens
            .get(lookup_hash)
            .cloned()
    }

    /// Number of unrevoked sessions of a user.
    pub async fn active_sessions(&self, user_id: UserId) -> usize {
        self.state
            .lock()
            .await
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id && !t.is_revoked())
            .count()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let mut state = self.state.lock().await;

        if state.users.values().any(|u| u.email == user.email) {
            return Err(UserError::EmailAlreadyExists(user.email.masked()));
        }

        state.next_user_id += 1;
        let created = User {
            id: UserId(state.next_user_id),
            email: user.email,
            nick: user.nick,
            password_hash: user.password_hash,
            role: Role::default(),
            email_verified: false,
            banned: false,
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn mark_email_verified(&self, id: UserId) -> Result<(), UserError> {
        self.state.lock().await.user_mut(id)?.email_verified = true;
        Ok(())
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), UserError> {
        self.state.lock().await.user_mut(id)?.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_banned(&self, id: UserId, banned: bool) -> Result<(), UserError> {
        self.state.lock().await.user_mut(id)?.banned = banned;
        Ok(())
    }
}

#[async_trait]
impl SingleUseTokenRepository for InMemoryStore {
    async fn upsert(&self, token: SingleUseToken) -> Result<(), SingleUseTokenError> {
        self.state
            .lock()
            .await
            .single_use_tokens
            .insert((token.user_id, token.purpose), token);
        Ok(())
    }

    async fn consume(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        effect: TokenEffect,
    ) -> Result<Option<UserId>, SingleUseTokenError> {
        let mut state = self.state.lock().await;
        let purpose = effect.purpose();

        let Some(key) = state
            .single_use_tokens
            .iter()
            .find(|(_, t)| t.token_hash == token_hash && t.purpose == purpose)
            .map(|(key, _)| *key)
        else {
            return Ok(None);
        };

        // Expired tokens stay until superseded, like rows in the table.
        if state.single_use_tokens[&key].expires_at <= now {
            return Ok(None);
        }

        let user_id = key.0;
        let user = state
            .user_mut(user_id)
            .map_err(|e| SingleUseTokenError::DatabaseError(e.to_string()))?;
        match effect {
            TokenEffect::MarkEmailVerified => user.email_verified = true,
            TokenEffect::SetPasswordHash(password_hash) => user.password_hash = password_hash,
        }
        state.single_use_tokens.remove(&key);

        Ok(Some(user_id))
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryStore {
    async fn insert(&self, token: RefreshToken) -> Result<(), SessionError> {
        self.state
            .lock()
            .await
            .refresh_tokens
            .insert(token.lookup_hash.clone(), token);
        Ok(())
    }

    async fn find_by_lookup(
        &self,
        lookup_hash: &str,
    ) -> Result<Option<RefreshToken>, SessionError> {
        Ok(self.refresh_token_by_lookup(lookup_hash).await)
    }

    async fn rotate(
        &self,
        lookup_hash: &str,
        replacement: ReplacementToken,
        now: DateTime<Utc>,
        check: TokenHashCheck,
    ) -> Result<RotationOutcome, SessionError> {
        let mut state = self.state.lock().await;

        let Some(previous) = state.refresh_tokens.get(lookup_hash).cloned() else {
            return Ok(RotationOutcome::Unknown);
        };

        if previous.is_revoked() {
            return Ok(RotationOutcome::Revoked(previous));
        }
        if previous.is_expired(now) {
            return Ok(RotationOutcome::Expired);
        }

        let stored = previous.token_hash.clone();
        let matches = tokio::task::spawn_blocking(move || check(&stored))
            .await
            .map_err(|e| SessionError::Unknown(format!("Verification task failed: {}", e)))?;
        if !matches {
            return Ok(RotationOutcome::Mismatch);
        }

        let current = replacement.inherit(&previous);
        if let Some(row) = state.refresh_tokens.get_mut(lookup_hash) {
            row.revoked_at = Some(now);
        }
        state
            .refresh_tokens
            .insert(current.lookup_hash.clone(), current.clone());

        Ok(RotationOutcome::Rotated { previous, current })
    }

    async fn revoke_all(&self, user_id: UserId, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let mut state = self.state.lock().await;
        let mut revoked = 0;

        for token in state
            .refresh_tokens
            .values_mut()
            .filter(|t| t.user_id == user_id && !t.is_revoked())
        {
            token.revoked_at = Some(now);
            revoked += 1;
        }

        Ok(revoked)
    }
}
