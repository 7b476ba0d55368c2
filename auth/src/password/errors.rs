use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("Argon2 could not hash the password: {0}")]
    Hash(String),

    /// The stored value is not a PHC string this hasher understands.
    #[error("Stored password hash is unreadable: {0}")]
    CorruptHash(String),
}
