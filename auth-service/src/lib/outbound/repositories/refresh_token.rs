use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::ReplacementToken;
use crate::domain::session::models::RotationOutcome;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::session::ports::TokenHashCheck;
use crate::domain::user::models::UserId;

pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: i64,
    lookup_hash: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    device_info: Option<String>,
    source_ip: Option<String>,
}

impl RefreshTokenRow {
    fn into_token(self) -> RefreshToken {
        RefreshToken {
            id: RefreshTokenId(self.id),
            user_id: UserId(self.user_id),
            lookup_hash: self.lookup_hash,
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            created_at: self.created_at,
            revoked_at: self.revoked_at,
            device_info: self.device_info,
            source_ip: self.source_ip,
        }
    }
}

fn database_error(e: sqlx::Error) -> SessionError {
    SessionError::DatabaseError(e.to_string())
}

const INSERT_REFRESH_TOKEN: &str = r#"
    INSERT INTO refresh_tokens
        (id, user_id, lookup_hash, token_hash, expires_at, created_at, device_info, source_ip)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn insert(&self, token: RefreshToken) -> Result<(), SessionError> {
        sqlx::query(INSERT_REFRESH_TOKEN)
            .bind(token.id.0)
            .bind(token.user_id.0)
            .bind(&token.lookup_hash)
            .bind(&token.token_hash)
            .bind(token.expires_at)
            .bind(token.created_at)
            .bind(&token.device_info)
            .bind(&token.source_ip)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn find_by_lookup(
        &self,
        lookup_hash: &str,
    ) -> Result<Option<RefreshToken>, SessionError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, lookup_hash, token_hash, expires_at, created_at,
                   revoked_at, device_info, source_ip
            FROM refresh_tokens
            WHERE lookup_hash = $1
            "#,
        )
        .bind(lookup_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(RefreshTokenRow::into_token))
    }

    async fn rotate(
        &self,
        lookup_hash: &str,
        replacement: ReplacementToken,
        now: DateTime<Utc>,
        check: TokenHashCheck,
    ) -> Result<RotationOutcome, SessionError> {
        // Dropping `tx` without commit rolls back.
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, user_id, lookup_hash, token_hash, expires_at, created_at,
                   revoked_at, device_info, source_ip
            FROM refresh_tokens
            WHERE lookup_hash = $1
            FOR UPDATE
            "#,
        )
        .bind(lookup_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error)?;

        let Some(row) = row else {
            return Ok(RotationOutcome::Unknown);
        };
        let previous = row.into_token();

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

        sqlx::query("UPDATE refresh_tokens SET revoked_at = $2 WHERE id = $1")
            .bind(previous.id.0)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        let current = replacement.inherit(&previous);
        sqlx::query(INSERT_REFRESH_TOKEN)
            .bind(current.id.0)
            .bind(current.user_id.0)
            .bind(&current.lookup_hash)
            .bind(&current.token_hash)
            .bind(current.expires_at)
            .bind(current.created_at)
            .bind(&current.device_info)
            .bind(&current.source_ip)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        Ok(RotationOutcome::Rotated { previous, current })
    }

    async fn revoke_all(&self, user_id: UserId, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id.0)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected())
    }
}
