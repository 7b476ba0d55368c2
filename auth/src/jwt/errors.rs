use thiserror::Error;

/// Session token failures.
///
/// `Expired` is reported only for tokens whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtError {
    #[error("Could not sign session: {0}")]
    Signing(String),

    #[error("Session rejected: {0}")]
    Rejected(String),

    #[error("Session claims unreadable: {0}")]
    MalformedClaims(String),

    #[error("Session expired")]
    Expired,
}
