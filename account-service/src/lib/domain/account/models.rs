use std::fmt;
use std::str::FromStr;

use auth::IssuedToken;
use chrono::DateTime;
use chrono::Datelike;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::account::errors::BirthYearError;
use crate::domain::account::errors::EmailError;
use crate::domain::account::errors::PasswordPolicyError;
use crate::domain::account::errors::UserIdError;
use crate::domain::account::errors::UsernameError;
use crate::domain::role::models::RoleId;

/// User identity record.
///
/// Holds at most one live verification token and one live reset token. Each
/// token carries its own expiry, so a token and its expiry are always written
/// together. `version` is bumped by the store on every successful save and is
/// used for compare-and-set updates.
#[derive(Clone)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub username: Username,
    pub password_hash: String,
    pub verification_token: Option<IssuedToken>,
    pub password_reset_token: Option<IssuedToken>,
    pub verified_at: Option<DateTime<Utc>>,
    pub birth_year: BirthYear,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("verification_token", &self.verification_token)
            .field("password_reset_token", &self.password_reset_token)
            .field("verified_at", &self.verified_at)
            .field("birth_year", &self.birth_year)
            .field("two_factor_enabled", &self.two_factor_enabled)
            .field("created_at", &self.created_at)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// Ensures username is 3-32 characters and contains only alphanumeric, underscore, and hyphen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 32;

    /// Create a new valid username.
    ///
    /// # Errors
    /// * `TooShort` - Username shorter than 3 characters
    /// * `TooLong` - Username longer than 32 characters
    /// * `InvalidCharacters` - Contains non-alphanumeric characters (except _ and -)
    pub fn new(username: String) -> Result<Self, UsernameError> {
        let length = username.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            });
        }
        if length > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(UsernameError::InvalidCharacters);
        }
        Ok(Self(username))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Trimmed and lower-cased on construction, so equality and storage lookups
/// are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated, normalised email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let normalised = email.trim().to_lowercase();
        email_address::EmailAddress::from_str(&normalised)
            .map(|_| EmailAddress(normalised))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password that satisfies the account password policy.
///
/// 6 to 128 characters with at least one lowercase letter, one uppercase
/// letter, one digit and one non-alphanumeric character.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    const MIN_LENGTH: usize = 6;
    const MAX_LENGTH: usize = 128;

    /// # Errors
    /// * `TooShort` / `TooLong` - Length outside 6..=128
    /// * `MissingCharacterClass` - A required character class is absent
    pub fn new(password: String) -> Result<Self, PasswordPolicyError> {
        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if length > Self::MAX_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

        if has_lower && has_upper && has_digit && has_symbol {
            Ok(Self(password))
        } else {
            Err(PasswordPolicyError::MissingCharacterClass)
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Year of birth, bounded by 1900 and the current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthYear(i32);

impl BirthYear {
    const MIN: i32 = 1900;

    pub fn new(year: i32) -> Result<Self, BirthYearError> {
        let max = Utc::now().year();
        if (Self::MIN..=max).contains(&year) {
            Ok(Self(year))
        } else {
            Err(BirthYearError::OutOfRange {
                year,
                min: Self::MIN,
                max,
            })
        }
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

/// Command to register a new account with validated fields
#[derive(Debug)]
pub struct RegisterCommand {
    pub email: EmailAddress,
    pub username: Username,
    pub password: Password,
    pub birth_year: BirthYear,
}

impl RegisterCommand {
    pub fn new(
        email: EmailAddress,
        username: Username,
        password: Password,
        birth_year: BirthYear,
    ) -> Self {
        Self {
            email,
            username,
            password,
            birth_year,
        }
    }
}

/// Credentials presented at login. The password is not policy-checked.
pub struct LoginCommand {
    pub email: EmailAddress,
    pub password: String,
    pub remember_me: bool,
}

impl fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCommand")
            .field("email", &self.email)
            .field("remember_me", &self.remember_me)
            .finish_non_exhaustive()
    }
}

/// Command to set a new password using a reset code.
pub struct ResetPasswordCommand {
    pub email: EmailAddress,
    pub reset_code: String,
    pub new_password: Password,
}

impl fmt::Debug for ResetPasswordCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetPasswordCommand")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Result of a registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    /// False when the verification notice could not be delivered.
    pub notification_sent: bool,
}

/// Authenticated session descriptor returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: EmailAddress,
    pub username: Username,
    pub roles: Vec<RoleId>,
    pub remember_me: bool,
}
