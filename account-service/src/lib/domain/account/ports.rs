use async_trait::async_trait;

use crate::domain::account::errors::AccountError;
use crate::domain::account::errors::NotifierError;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::LoginCommand;
use crate::domain::account::models::RegisterCommand;
use crate::domain::account::models::Registration;
use crate::domain::account::models::ResetPasswordCommand;
use crate::domain::account::models::Session;
use crate::domain::account::models::User;
use crate::domain::account::models::UserId;
use crate::domain::account::notifications::Notification;

/// Port for account lifecycle operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register a new, unverified account and send its verification token.
    ///
    /// # Arguments
    /// * `command` - Validated email, username, password and birth year
    ///
    /// # Returns
    /// The created user and whether the verification notice was delivered
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<Registration, AccountError>;

    /// Consume a verification token and mark the account verified.
    ///
    /// # Arguments
    /// * `user_id` - Account to verify
    /// * `token` - Token from the verification notice
    ///
    /// # Returns
    /// The verified user
    ///
    /// # Errors
    /// * `NotFound` - No such user
    /// * `InvalidToken` - Token does not match or was already used
    /// * `TokenExpired` - Token matched but its window has closed
    async fn confirm_email(&self, user_id: &UserId, token: &str) -> Result<User, AccountError>;

    /// Check credentials and build a session descriptor.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password
    /// * `NotVerified` - Email has not been confirmed
    async fn login(&self, command: LoginCommand) -> Result<Session, AccountError>;

    /// Start a password reset. Succeeds whether or not the email is registered.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), AccountError>;

    /// Consume a reset code and replace the password.
    ///
    /// # Errors
    /// * `InvalidToken` - Unknown email, wrong or already used code
    /// * `TokenExpired` - Code matched but its window has closed
    async fn reset_password(&self, command: ResetPasswordCommand) -> Result<(), AccountError>;

    /// Re-issue the verification token for an unverified account.
    /// Succeeds whether or not the email is registered.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn resend_confirmation(&self, email: &EmailAddress) -> Result<(), AccountError>;

    /// Turn on two-factor authentication for an account.
    ///
    /// # Errors
    /// * `NotFound` - No such user
    async fn enable_two_factor(&self, user_id: &UserId) -> Result<User, AccountError>;

    /// Retrieve a user by identifier.
    ///
    /// # Errors
    /// * `NotFound` - No such user
    async fn get_user(&self, user_id: &UserId) -> Result<User, AccountError>;
}

/// Persistence operations for user identity records.
///
/// Email lookups compare the normalised (lower-case) address.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// # Returns
    /// Created user entity
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, AccountError>;

    /// Retrieve user by identifier.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AccountError>;

    /// Retrieve user by email address.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AccountError>;

    /// Whether an account exists for `email`.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AccountError>;

    /// Write all mutable fields of `user` as one atomic update.
    ///
    /// The write only applies if the stored version still equals
    /// `user.version`; the returned user carries the bumped version.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `StaleRecord` - Record changed since it was read
    /// * `DatabaseError` - Database operation failed
    async fn save(&self, user: User) -> Result<User, AccountError>;
}

/// Outbound delivery of account notices (email dispatch lives elsewhere).
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver a notification.
    ///
    /// # Errors
    /// * `DeliveryFailed` - Transport failure
    /// * `Rejected` - Notifier refused the message
    /// * `Timeout` - No answer within the configured bound
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError>;
}
