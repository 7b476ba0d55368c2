use std::fmt;

use chrono::DateTime;
use chrono::Utc;

use crate::domain::account::models::UserId;
use crate::domain::role::errors::RoleError;
use crate::domain::role::errors::RoleIdError;

/// Role identifier such as `admin` or `moderator`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(String);

impl RoleId {
    pub const ADMIN: &'static str = "admin";
    pub const MODERATOR: &'static str = "moderator";
    pub const USER: &'static str = "user";

    /// Parse a role identifier.
    ///
    /// # Errors
    /// * `InvalidLength` - Outside 2..=32 characters
    /// * `InvalidCharacters` - Anything but `[a-z0-9_-]`
    pub fn new(id: impl Into<String>) -> Result<Self, RoleIdError> {
        let id = id.into();
        let length = id.chars().count();
        if !(2..=32).contains(&length) {
            return Err(RoleIdError::InvalidLength(length));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(RoleIdError::InvalidCharacters);
        }
        Ok(Self(id))
    }

    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    /// Roles every installation starts with.
    pub fn defaults() -> Vec<Role> {
        [
            (RoleId::ADMIN, "Administrator"),
            (RoleId::MODERATOR, "Moderator"),
            (RoleId::USER, "User"),
        ]
        .into_iter()
        .map(|(id, name)| Role {
            id: RoleId(id.to_string()),
            name: name.to_string(),
        })
        .collect()
    }
}

/// Membership of one user in one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub assigned_at: DateTime<Utc>,
}

/// Command to create a role with a validated id and name.
#[derive(Debug, Clone)]
pub struct CreateRoleCommand {
    pub id: RoleId,
    pub name: String,
}

impl CreateRoleCommand {
    /// # Errors
    /// * `InvalidName` - Name is blank or longer than 64 characters
    pub fn new(id: RoleId, name: String) -> Result<Self, RoleError> {
        let name = name.trim().to_string();
        if name.is_empty() || name.chars().count() > 64 {
            return Err(RoleError::InvalidName(name));
        }
        Ok(Self { id, name })
    }
}

/// Whether an assign call created a new membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned,
    AlreadyHeld,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    NotHeld,
}
