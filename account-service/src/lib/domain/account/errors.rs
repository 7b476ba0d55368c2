use thiserror::Error;

use crate::domain::errors::ErrorKind;
use crate::domain::role::errors::RoleError;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for Username validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Username too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Username too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error(
        "Username contains invalid characters (only alphanumeric, underscore, and hyphen allowed)"
    )]
    InvalidCharacters,
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Password policy violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min} characters")]
    TooShort { min: usize },

    #[error("Password too long: maximum {max} characters")]
    TooLong { max: usize },

    #[error("Password must contain a lowercase letter, an uppercase letter, a digit and a symbol")]
    MissingCharacterClass,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BirthYearError {
    #[error("Birth year {year} is outside {min}..={max}")]
    OutOfRange { year: i32, min: i32, max: i32 },
}

/// Notification delivery failures.
#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Notification rejected by notifier: {0}")]
    Rejected(String),

    #[error("Notification timed out")]
    Timeout,
}

/// Top-level error for account operations
#[derive(Debug, Clone, Error)]
pub enum AccountError {
    #[error("Invalid user ID: {0}")]
    InvalidUserId(#[from] UserIdError),

    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid password: {0}")]
    InvalidPassword(#[from] PasswordPolicyError),

    #[error("Invalid birth year: {0}")]
    InvalidBirthYear(#[from] BirthYearError),

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not verified")]
    NotVerified,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User record was modified concurrently: {0}")]
    StaleRecord(String),

    #[error("Role error: {0}")]
    Role(#[from] RoleError),

    #[error("Password hashing failed: {0}")]
    Password(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::InvalidUserId(_)
            | AccountError::InvalidUsername(_)
            | AccountError::InvalidEmail(_)
            | AccountError::InvalidPassword(_)
            | AccountError::InvalidBirthYear(_) => ErrorKind::Validation,
            AccountError::EmailAlreadyExists => ErrorKind::Conflict,
            AccountError::NotFound(_) => ErrorKind::NotFound,
            AccountError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AccountError::NotVerified => ErrorKind::NotVerified,
            AccountError::InvalidToken => ErrorKind::InvalidToken,
            AccountError::TokenExpired => ErrorKind::Expired,
            AccountError::Role(err) => err.kind(),
            AccountError::StaleRecord(_)
            | AccountError::Password(_)
            | AccountError::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

impl From<auth::PasswordError> for AccountError {
    fn from(err: auth::PasswordError) -> Self {
        AccountError::Password(err.to_string())
    }
}
