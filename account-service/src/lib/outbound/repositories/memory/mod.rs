//! In-memory storage used when no database is configured, and by tests.

mod oauth_token;
mod role;
mod user;

pub use oauth_token::MemoryOAuthTokenRepository;
pub use role::MemoryRoleRepository;
pub use user::MemoryUserRepository;
