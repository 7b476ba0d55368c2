use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::account::models::UserId;
use crate::domain::oauth::errors::ProviderError;
use crate::domain::oauth::errors::ProviderNameError;

/// Configured provider key such as `spotify`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderName(String);

impl ProviderName {
    const MAX_LENGTH: usize = 32;

    /// Parse a provider name, trimming and lower-casing it.
    ///
    /// # Errors
    /// * `InvalidLength` - Empty or longer than 32 characters
    /// * `InvalidCharacters` - Anything but `[a-z0-9_-]`
    pub fn new(name: &str) -> Result<Self, ProviderNameError> {
        let name = name.trim().to_lowercase();
        let length = name.chars().count();
        if length == 0 || length > Self::MAX_LENGTH {
            return Err(ProviderNameError::InvalidLength(length));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ProviderNameError::InvalidCharacters);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stored access/refresh pair for one (user, provider).
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthTokenRecord {
    pub user_id: UserId,
    pub provider: ProviderName,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthTokenRecord {
    /// True once `now` is inside the refresh buffer before expiry.
    pub fn needs_refresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now >= self.expires_at - buffer
    }
}

impl fmt::Debug for OAuthTokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokenRecord")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Tokens as returned by the provider's token endpoint.
#[derive(Clone)]
pub struct ProviderTokens {
    pub access_token: String,
    /// Present when the provider issued or rotated the refresh token.
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

impl ProviderTokens {
    /// Longest access token lifetime taken at face value. Longer grants are
    /// stored with this lifetime and simply refreshed early.
    pub const MAX_LIFETIME_SECONDS: i64 = 24 * 60 * 60;

    /// Absolute expiry of the access token when issued at `now`.
    ///
    /// # Errors
    /// * `Rejected` - The provider reported a lifetime of zero or less
    pub fn expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ProviderError> {
        if self.expires_in <= 0 {
            return Err(ProviderError::Rejected {
                status: 200,
                message: format!("token response has non-positive expires_in {}", self.expires_in),
            });
        }

        Duration::try_seconds(self.expires_in.min(Self::MAX_LIFETIME_SECONDS))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| ProviderError::Rejected {
                status: 200,
                message: format!("token response has out-of-range expires_in {}", self.expires_in),
            })
    }
}

impl fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Public view of a link; never carries tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub linked: bool,
    pub expires_at: Option<DateTime<Utc>>,
}
