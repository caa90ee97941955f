use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::Nick;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;
use crate::user::ports::UserRepository;

const DUMMY_PASSWORD: &str = "timing-equalizer";

/// Credential store.
///
/// Owns user identity, password hashes and verification state. Argon2 runs
/// on the blocking pool so the async workers never stall on the KDF.
pub struct CredentialStore<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    password_hasher: auth::PasswordHasher,
    dummy_hash: OnceCell<String>,
}

impl<UR> CredentialStore<UR>
where
    UR: UserRepository,
{
    /// Create a new credential store.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    pub fn new(repository: Arc<UR>) -> Self {
        Self {
            repository,
            password_hasher: auth::PasswordHasher::new(),
            dummy_hash: OnceCell::new(),
        }
    }

    /// Hash a plaintext password with Argon2id.
    ///
    /// # Errors
    /// * `Password` - Hashing failed
    /// * `Unknown` - Blocking task was cancelled
    pub async fn hash_password(&self, plaintext: &str) -> Result<String, UserError> {
        let hasher = self.password_hasher;
        let plaintext = plaintext.to_string();

        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| UserError::Unknown(format!("Hashing task failed: {}", e)))??;

        Ok(hash)
    }

    /// Check a plaintext password against a user's stored hash.
    ///
    /// # Errors
    /// * `Password` - Stored hash is malformed
    /// * `Unknown` - Blocking task was cancelled
    pub async fn verify_password(&self, user: &User, plaintext: &str) -> Result<bool, UserError> {
        self.verify_against(&user.password_hash, plaintext).await
    }

    async fn verify_against(&self, hash: &str, plaintext: &str) -> Result<bool, UserError> {
        let hasher = self.password_hasher;
        let hash = hash.to_string();
        let plaintext = plaintext.to_string();

        let matches = tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .map_err(|e| UserError::Unknown(format!("Verification task failed: {}", e)))??;

        Ok(matches)
    }

    /// Create a user from validated data.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered (case-insensitive)
    /// * `DatabaseError` - Database operation failed
    pub async fn create_user(
        &self,
        email: EmailAddress,
        nick: Nick,
        password_hash: String,
    ) -> Result<User, UserError> {
        let user = self
            .repository
            .create(NewUser {
                email,
                nick,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, email = %user.email.masked(), "User created");

        Ok(user)
    }

    /// # Errors
    /// * `NotFound` - No user with this email
    /// * `DatabaseError` - Database operation failed
    pub async fn get_by_email(&self, email: &EmailAddress) -> Result<User, UserError> {
        self.repository
            .find_by_email(email)
            .await?
            .ok_or_else(|| UserError::NotFound(email.masked()))
    }

    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    pub async fn get_by_id(&self, id: UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| UserError::NotFound(id.to_string()))
    }

    /// Resolve an email and password to a user.
    ///
    /// Unknown email still pays for one Argon2 verification against a dummy
    /// hash, so both failure paths take the same time and return the same
    /// error.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password
    /// * `DatabaseError` - Database operation failed
    pub async fn verify_credentials(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<User, UserError> {
        let Some(user) = self.repository.find_by_email(email).await? else {
            let dummy_hash = self
                .dummy_hash
                .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD))
                .await?;
            self.verify_against(dummy_hash, password).await?;
            return Err(UserError::InvalidCredentials);
        };

        if self.verify_password(&user, password).await? {
            Ok(user)
        } else {
            Err(UserError::InvalidCredentials)
        }
    }

    pub async fn mark_email_verified(&self, id: UserId) -> Result<(), UserError> {
        self.repository.mark_email_verified(id).await
    }

    pub async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), UserError> {
        self.repository.set_password_hash(id, password_hash).await
    }

    /// Ban or unban a user. Sessions are not touched here; the next refresh
    /// of a banned user revokes them.
    pub async fn set_banned(&self, id: UserId, banned: bool) -> Result<(), UserError> {
        self.repository.set_banned(id, banned).await?;
        tracing::info!(user_id = %id, banned, "User ban state changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::user::models::Role;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: NewUser) -> Result<User, UserError>;
            async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserError>;
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;
            async fn mark_email_verified(&self, id: UserId) -> Result<(), UserError>;
            async fn set_password_hash(
                &self,
                id: UserId,
                password_hash: &str,
            ) -> Result<(), UserError>;
            async fn set_banned(&self, id: UserId, banned: bool) -> Result<(), UserError>;
        }
    }

    fn user_with_hash(password_hash: String) -> User {
        User {
            id: UserId(7),
            email: EmailAddress::new("alice@example.com".to_string()).unwrap(),
            nick: Nick::new("Alice".to_string()).unwrap(),
            password_hash,
            role: Role::Participant,
            email_verified: true,
            banned: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_user_success() {
        let mut repository = MockTestUserRepository::new();

        repository
            .expect_create()
            .withf(|user| {
                user.email.as_str() == "alice@example.com" && user.nick.as_str() == "Alice"
            })
            .times(1)
            .returning(|user| {
                Ok(User {
                    id: UserId(1),
                    email: user.email,
                    nick: user.nick,
                    password_hash: user.password_hash,
                    role: Role::default(),
                    email_verified: false,
                    banned: false,
                    created_at: Utc::now(),
                })
            });

        let store = CredentialStore::new(Arc::new(repository));
        let hash = store.hash_password("Secret1").await.unwrap();
        assert!(hash.starts_with("$argon2"));

        let user = store
            .create_user(
                EmailAddress::new("Alice@Example.com".to_string()).unwrap(),
                Nick::new("Alice".to_string()).unwrap(),
                hash,
            )
            .await
            .unwrap();

        assert_eq!(user.id, UserId(1));
        assert_eq!(user.role, Role::Participant);
        assert!(!user.email_verified);
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email() {
        let mut repository = MockTestUserRepository::new();

        repository.expect_create().times(1).returning(|user| {
            Err(UserError::EmailAlreadyExists(
                user.email.as_str().to_string(),
            ))
        });

        let store = CredentialStore::new(Arc::new(repository));

        let result = store
            .create_user(
                EmailAddress::new("alice@example.com".to_string()).unwrap(),
                Nick::new("Alice".to_string()).unwrap(),
                "$argon2id$test_hash".to_string(),
            )
            .await;

        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let mut repository = MockTestUserRepository::new();

        repository
            .expect_find_by_id()
            .with(eq(UserId(99)))
            .times(1)
            .returning(|_| Ok(None));

        let store = CredentialStore::new(Arc::new(repository));

        let result = store.get_by_id(UserId(99)).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_verify_credentials_success() {
        let hash = auth::PasswordHasher::new().hash("Secret1").unwrap();
        let user = user_with_hash(hash);

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let store = CredentialStore::new(Arc::new(repository));
        let email = EmailAddress::new("alice@example.com".to_string()).unwrap();

        let user = store.verify_credentials(&email, "Secret1").await.unwrap();
        assert_eq!(user.id, UserId(7));
    }

    #[tokio::test]
    async fn test_verify_credentials_wrong_password() {
        let hash = auth::PasswordHasher::new().hash("Secret1").unwrap();
        let user = user_with_hash(hash);

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let store = CredentialStore::new(Arc::new(repository));
        let email = EmailAddress::new("alice@example.com".to_string()).unwrap();

        let result = store.verify_credentials(&email, "Secret2").await;
        assert!(matches!(result, Err(UserError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_verify_credentials_unknown_email_matches_wrong_password() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_email()
            .times(2)
            .returning(|_| Ok(None));

        let store = CredentialStore::new(Arc::new(repository));
        let email = EmailAddress::new("nobody@example.com".to_string()).unwrap();

        for _ in 0..2 {
            let result = store.verify_credentials(&email, "Secret1").await;
            assert!(matches!(result, Err(UserError::InvalidCredentials)));
        }
        assert!(store.dummy_hash.initialized());
    }

    #[tokio::test]
    async fn test_state_transitions_delegate_to_repository() {
        let mut repository = MockTestUserRepository::new();

        repository
            .expect_mark_email_verified()
            .with(eq(UserId(3)))
            .times(1)
            .returning(|_| Ok(()));
        repository
            .expect_set_password_hash()
            .withf(|id, hash| *id == UserId(3) && hash == "$argon2id$new")
            .times(1)
            .returning(|_, _| Ok(()));
        repository
            .expect_set_banned()
            .with(eq(UserId(3)), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let store = CredentialStore::new(Arc::new(repository));

        store.mark_email_verified(UserId(3)).await.unwrap();
        store
            .set_password_hash(UserId(3), "$argon2id$new")
            .await
            .unwrap();
        store.set_banned(UserId(3), true).await.unwrap();
    }
}
