//! Authentication utilities library
//!
//! Reusable credential primitives for the account service:
//! - Password hashing (Argon2id)
//! - One-time token issuance and constant-time validation
//! - Signed session tokens (JWT)
//! - Injectable clock
//!
//! Services define their own domain types and adapt these implementations.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("Str0ng!Pass").unwrap();
//! assert!(hasher.verify("Str0ng!Pass", &hash).unwrap());
//! ```
//!
//! ## One-time Tokens
//! ```
//! use std::sync::Arc;
//!
//! use auth::{SystemClock, TokenIssuer, TokenKind, TokenValidation, TokenWindows};
//!
//! let issuer = TokenIssuer::new(TokenWindows::default(), Arc::new(SystemClock));
//! let token = issuer.issue(TokenKind::EmailVerification);
//! assert_eq!(issuer.check(Some(&token), &token.value), TokenValidation::Valid);
//! assert_eq!(issuer.check(Some(&token), "guess"), TokenValidation::Mismatch);
//! ```
//!
//! ## Sessions
//! ```
//! use auth::Authenticator;
//!
//! let auth = Authenticator::new(b"secret_key_at_least_32_bytes_long!");
//! let session = auth
//!     .issue_session("user123", "alice@example.com", vec!["user".into()], false)
//!     .unwrap();
//! let claims = auth.validate_session(&session.access_token).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```

pub mod authenticator;
pub mod clock;
pub mod jwt;
pub mod password;
pub mod token;

pub use authenticator::Authenticator;
pub use authenticator::IssuedSession;
pub use authenticator::SessionLifetimes;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::SessionClaims;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::EntropySource;
pub use token::IssuedToken;
pub use token::OsEntropy;
pub use token::TokenIssuer;
pub use token::TokenKind;
pub use token::TokenValidation;
pub use token::TokenWindows;
