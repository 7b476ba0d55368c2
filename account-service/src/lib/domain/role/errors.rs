use thiserror::Error;

use crate::domain::errors::ErrorKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleIdError {
    #[error("Role id must be 2-32 characters, got {0}")]
    InvalidLength(usize),

    #[error("Role id may only contain lowercase letters, digits, underscore and hyphen")]
    InvalidCharacters,
}

/// Errors raised by role assignment and authorization checks.
#[derive(Debug, Clone, Error)]
pub enum RoleError {
    #[error("Invalid role id: {0}")]
    InvalidRoleId(#[from] RoleIdError),

    #[error("Invalid role name: {0}")]
    InvalidName(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Role already exists: {0}")]
    RoleAlreadyExists(String),

    #[error("Missing required role: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl RoleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoleError::InvalidRoleId(_) | RoleError::InvalidName(_) => ErrorKind::Validation,
            RoleError::RoleNotFound(_) => ErrorKind::NotFound,
            RoleError::RoleAlreadyExists(_) => ErrorKind::Conflict,
            RoleError::Forbidden(_) => ErrorKind::Forbidden,
            RoleError::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}
