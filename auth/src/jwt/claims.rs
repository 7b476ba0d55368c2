use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Claims carried by a session token.
///
/// Roles are informational only; authorization decisions must be re-checked
/// against the role store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject (user identifier)
    pub sub: String,

    pub email: String,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub remember_me: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Build claims valid for `lifetime` starting at `issued_at`.
    ///
    /// # Arguments
    /// * `user_id` - Unique user identifier
    /// * `email` - Normalised email address
    /// * `roles` - Role identifiers held at login time
    /// * `remember_me` - Whether the long-lived lifetime was requested
    /// * `issued_at` - Issue instant
    /// * `lifetime` - Validity period
    pub fn new(
        user_id: impl ToString,
        email: impl Into<String>,
        roles: Vec<String>,
        remember_me: bool,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            email: email.into(),
            roles,
            remember_me,
            iat: issued_at.timestamp(),
            exp: (issued_at + lifetime).timestamp(),
        }
    }

    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }
}
