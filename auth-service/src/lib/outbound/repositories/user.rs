use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::Nick;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

const USER_COLUMNS: &str =
    "id, email, nick, password_hash, role, email_verified, banned, created_at";

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update_one(
        &self,
        id: UserId,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<(), UserError> {
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(id.to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    nick: String,
    password_hash: String,
    role: String,
    email_verified: bool,
    banned: bool,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, UserError> {
        Ok(User {
            id: UserId(self.id),
            email: EmailAddress::new(self.email)?,
            nick: Nick::new(self.nick)?,
            password_hash: self.password_hash,
            role: self.role.parse()?,
            email_verified: self.email_verified,
            banned: self.banned,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let sql = format!(
            "INSERT INTO users (email, nick, password_hash) \
             VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.email.as_str())
            .bind(user.nick.as_str())
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation()
                        && db_err.constraint() == Some("users_email_key")
                    {
                        return UserError::EmailAlreadyExists(user.email.masked());
                    }
                }
                UserError::DatabaseError(e.to_string())
            })?;

        row.into_user()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?
            .map(UserRow::into_user)
            .transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?
            .map(UserRow::into_user)
            .transpose()
    }

    async fn mark_email_verified(&self, id: UserId) -> Result<(), UserError> {
        self.update_one(
            id,
            sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1").bind(id.0),
        )
        .await
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), UserError> {
        self.update_one(
            id,
            sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
                .bind(id.0)
                .bind(password_hash),
        )
        .await
    }

    async fn set_banned(&self, id: UserId, banned: bool) -> Result<(), UserError> {
        self.update_one(
            id,
            sqlx::query("UPDATE users SET banned = $2 WHERE id = $1")
                .bind(id.0)
                .bind(banned),
        )
        .await
    }
}
