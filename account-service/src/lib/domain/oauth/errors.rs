use thiserror::Error;

use crate::domain::errors::ErrorKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderNameError {
    #[error("Provider name must be 1-32 characters, got {0}")]
    InvalidLength(usize),

    #[error("Provider name may only contain lowercase letters, digits, underscore and hyphen")]
    InvalidCharacters,
}

/// Failures reported by an authorization server adapter.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The grant (code or refresh token) is invalid, expired or revoked.
    #[error("Grant rejected by provider: {0}")]
    InvalidGrant(String),

    #[error("Provider rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Provider unreachable: {0}")]
    Transient(String),

    #[error("Provider did not answer in time")]
    Timeout,

    #[error("Provider not configured: {0}")]
    UnknownProvider(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_) | ProviderError::Timeout)
    }
}

/// Top-level error for linked provider accounts.
#[derive(Debug, Clone, Error)]
pub enum OAuthError {
    #[error("Invalid provider: {0}")]
    InvalidProvider(#[from] ProviderNameError),

    #[error("Provider not configured: {0}")]
    UnknownProvider(String),

    #[error("Invalid or expired authorization state")]
    InvalidState,

    #[error("No linked account for provider: {0}")]
    NotLinked(String),

    #[error("Authorization server error: {0}")]
    ExternalService(String),

    #[error("Provider authorization must be renewed: {0}")]
    ReauthorizationRequired(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl OAuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OAuthError::InvalidProvider(_)
            | OAuthError::UnknownProvider(_)
            | OAuthError::InvalidState => ErrorKind::Validation,
            OAuthError::NotLinked(_) => ErrorKind::NotFound,
            OAuthError::ExternalService(_) => ErrorKind::ExternalService,
            OAuthError::ReauthorizationRequired(_) => ErrorKind::ReauthorizationRequired,
            OAuthError::DatabaseError(_) => ErrorKind::Internal,
        }
    }

    /// Map a failed code exchange. A rejected code is a provider failure, not
    /// a revoked authorization.
    pub fn from_exchange(err: ProviderError) -> Self {
        match err {
            ProviderError::UnknownProvider(name) => OAuthError::UnknownProvider(name),
            other => OAuthError::ExternalService(other.to_string()),
        }
    }

    /// Map a failed refresh. An invalid grant means the stored refresh token
    /// is dead and the user has to authorize again.
    pub fn from_refresh(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidGrant(reason) => OAuthError::ReauthorizationRequired(reason),
            ProviderError::UnknownProvider(name) => OAuthError::UnknownProvider(name),
            other => OAuthError::ExternalService(other.to_string()),
        }
    }
}
