use std::sync::Arc;

use chrono::Duration;

use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::SessionClaims;

/// Session lifetimes for normal and "remember me" logins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifetimes {
    pub standard: Duration,
    pub remember_me: Duration,
}

impl Default for SessionLifetimes {
    fn default() -> Self {
        Self {
            standard: Duration::hours(24),
            remember_me: Duration::days(30),
        }
    }
}

/// A signed session token and its claims.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub claims: SessionClaims,
}

/// Issues and validates signed session tokens.
///
/// Coordinates the JWT handler with the configured lifetimes and clock. Password
/// verification happens before this point; the authenticator only turns an
/// already authenticated identity into a bearer token.
pub struct Authenticator {
    jwt_handler: JwtHandler,
    lifetimes: SessionLifetimes,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    /// Create a new authenticator with default lifetimes.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(jwt_secret: &[u8]) -> Self {
        Self {
            jwt_handler: JwtHandler::new(jwt_secret),
            lifetimes: SessionLifetimes::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_lifetimes(mut self, lifetimes: SessionLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a session token for an authenticated user.
    ///
    /// # Arguments
    /// * `user_id` - Authenticated user identifier
    /// * `email` - User email
    /// * `roles` - Roles held at login time
    /// * `remember_me` - Selects the long-lived lifetime
    ///
    /// # Returns
    /// Signed token with its claims
    ///
    /// # Errors
    /// * `Signing` - Token generation failed
    pub fn issue_session(
        &self,
        user_id: impl ToString,
        email: impl Into<String>,
        roles: Vec<String>,
        remember_me: bool,
    ) -> Result<IssuedSession, JwtError> {
        let lifetime = if remember_me {
            self.lifetimes.remember_me
        } else {
            self.lifetimes.standard
        };

        let claims = SessionClaims::new(
            user_id,
            email,
            roles,
            remember_me,
            self.clock.now(),
            lifetime,
        );
        let access_token = self.jwt_handler.sign(&claims)?;

        Ok(IssuedSession {
            access_token,
            claims,
        })
    }

    /// Validate a session token and return its claims.
    ///
    /// Expiry is judged against the authenticator's clock, with no leeway.
    ///
    /// # Errors
    /// * `Rejected` - Signature or structure is invalid
    /// * `MalformedClaims` - Claims could not be read
    /// * `Expired` - Session has expired
    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, JwtError> {
        let claims: SessionClaims = self.jwt_handler.verify(token)?;

        if claims.is_expired(self.clock.now().timestamp()) {
            return Err(JwtError::Expired);
        }
        Ok(claims)
    }
}
