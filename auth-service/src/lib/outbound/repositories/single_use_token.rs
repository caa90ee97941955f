use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::token::errors::SingleUseTokenError;
use crate::domain::token::models::SingleUseToken;
use crate::domain::token::models::TokenEffect;
use crate::domain::token::ports::SingleUseTokenRepository;
use crate::domain::user::models::UserId;

pub struct PostgresSingleUseTokenRepository {
    pool: PgPool,
}

impl PostgresSingleUseTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(e: sqlx::Error) -> SingleUseTokenError {
    SingleUseTokenError::DatabaseError(e.to_string())
}

#[async_trait]
impl SingleUseTokenRepository for PostgresSingleUseTokenRepository {
    async fn upsert(&self, token: SingleUseToken) -> Result<(), SingleUseTokenError> {
        sqlx::query(
            r#"
            INSERT INTO single_use_tokens (token_hash, user_id, purpose, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, purpose) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&token.token_hash)
        .bind(token.user_id.0)
        .bind(token.purpose.as_str())
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn consume(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        effect: TokenEffect,
    ) -> Result<Option<UserId>, SingleUseTokenError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // The DELETE takes the row lock; a concurrent consumer finds nothing.
        let user_id: Option<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM single_use_tokens
            WHERE token_hash = $1 AND purpose = $2 AND expires_at > $3
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .bind(effect.purpose().as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error)?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        match &effect {
            TokenEffect::MarkEmailVerified => {
                sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(database_error)?;
            }
            TokenEffect::SetPasswordHash(password_hash) => {
                sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
                    .bind(user_id)
                    .bind(password_hash)
                    .execute(&mut *tx)
                    .await
                    .map_err(database_error)?;
            }
        }

        tx.commit().await.map_err(database_error)?;

        Ok(Some(UserId(user_id)))
    }
}
