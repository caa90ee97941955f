use async_trait::async_trait;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;

/// Persistence operations for user aggregate.
///
/// State transitions are explicit methods; there is no generic update.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Arguments
    /// * `user` - Validated user data with password hash
    ///
    /// # Returns
    /// Created user entity with assigned id
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: NewUser) -> Result<User, UserError>;

    /// Retrieve user by identifier.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserError>;

    /// Retrieve user by normalized email address.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;

    /// Mark the user's email as verified. Idempotent.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn mark_email_verified(&self, id: UserId) -> Result<(), UserError>;

    /// Replace the stored password hash. Idempotent.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<(), UserError>;

    /// Ban or unban the user.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn set_banned(&self, id: UserId, banned: bool) -> Result<(), UserError>;
}
