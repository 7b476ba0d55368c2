mod oauth_token;
mod role;
mod user;

pub use oauth_token::PostgresOAuthTokenRepository;
pub use role::PostgresRoleRepository;
pub use user::PostgresUserRepository;
