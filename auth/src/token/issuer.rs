use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use super::compare::constant_time_eq;
use super::entropy::EntropySource;
use super::entropy::OsEntropy;
use crate::clock::Clock;

/// Number of random bytes behind every token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Families of one-time tokens, each with its own validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    EmailVerification,
    PasswordReset,
    OAuthState,
}

/// Validity windows per token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenWindows {
    pub email_verification: Duration,
    pub password_reset: Duration,
    pub oauth_state: Duration,
}

impl TokenWindows {
    /// Window applied to tokens of `kind`.
    pub fn window_for(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::EmailVerification => self.email_verification,
            TokenKind::PasswordReset => self.password_reset,
            TokenKind::OAuthState => self.oauth_state,
        }
    }
}

impl Default for TokenWindows {
    fn default() -> Self {
        Self {
            email_verification: Duration::hours(24),
            password_reset: Duration::hours(1),
            oauth_state: Duration::minutes(10),
        }
    }
}

/// A freshly issued token together with its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Outcome of checking a presented token against the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidation {
    Valid,
    Expired,
    Mismatch,
}

/// Issues and validates opaque, time-bounded one-time tokens.
///
/// Tokens are 32 bytes from the configured entropy source, encoded as
/// unpadded URL-safe base64. Issuance never touches storage: callers persist
/// the returned [`IssuedToken`] themselves and clear it once consumed.
pub struct TokenIssuer {
    windows: TokenWindows,
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn EntropySource>,
}

impl TokenIssuer {
    /// Create an issuer drawing randomness from the operating system.
    ///
    /// # Arguments
    /// * `windows` - Validity window per token kind
    /// * `clock` - Time source used for expiry computation and checks
    pub fn new(windows: TokenWindows, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows,
            clock,
            entropy: Arc::new(OsEntropy),
        }
    }

    /// Replace the entropy source.
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Current time as seen by this issuer's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn windows(&self) -> &TokenWindows {
        &self.windows
    }

    /// Issue a new token of `kind` expiring at `now + window(kind)`.
    pub fn issue(&self, kind: TokenKind) -> IssuedToken {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.entropy.fill(&mut bytes);

        IssuedToken {
            value: URL_SAFE_NO_PAD.encode(bytes),
            expires_at: self.clock.now() + self.windows.window_for(kind),
        }
    }

    /// Check `presented` against a stored token using the issuer's clock.
    pub fn check(&self, stored: Option<&IssuedToken>, presented: &str) -> TokenValidation {
        Self::validate(
            stored.map(|t| t.value.as_str()),
            stored.map(|t| t.expires_at),
            presented,
            self.clock.now(),
        )
    }

    /// Validate a presented token against stored state at instant `now`.
    ///
    /// A token that differs from the stored one is a `Mismatch` regardless of
    /// expiry; `Expired` is only reported for an exact match whose window has
    /// closed (`now >= expires_at`). A missing stored token or expiry always
    /// yields `Mismatch`, but the comparison is still performed.
    ///
    /// # Arguments
    /// * `stored_token` - Token currently on record, if any
    /// * `stored_expires_at` - Expiry of the stored token, if any
    /// * `presented` - Token supplied by the caller
    /// * `now` - Instant to evaluate expiry against
    ///
    /// # Returns
    /// `Valid`, `Expired` or `Mismatch`
    pub fn validate(
        stored_token: Option<&str>,
        stored_expires_at: Option<DateTime<Utc>>,
        presented: &str,
        now: DateTime<Utc>,
    ) -> TokenValidation {
        let matches = constant_time_eq(stored_token.unwrap_or_default(), presented);

        match (stored_token, stored_expires_at) {
            (Some(_), Some(expires_at)) if matches => {
                if now >= expires_at {
                    TokenValidation::Expired
                } else {
                    TokenValidation::Valid
                }
            }
            _ => TokenValidation::Mismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU8;
    use std::sync::atomic::Ordering;

    use chrono::TimeZone;

    use super::*;
    use crate::clock::ManualClock;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap()
    }

    struct SequentialEntropy(AtomicU8);

    impl EntropySource for SequentialEntropy {
        fn fill(&self, buf: &mut [u8]) {
            let seed = self.0.fetch_add(1, Ordering::SeqCst);
            buf.iter_mut().for_each(|b| *b = seed);
        }
    }

    #[test]
    fn test_issue_uses_kind_window() {
        let clock = Arc::new(ManualClock::new(start()));
        let issuer = TokenIssuer::new(TokenWindows::default(), clock);

        let verification = issuer.issue(TokenKind::EmailVerification);
        let reset = issuer.issue(TokenKind::PasswordReset);
        let state = issuer.issue(TokenKind::OAuthState);

        assert_eq!(verification.expires_at, start() + Duration::hours(24));
        assert_eq!(reset.expires_at, start() + Duration::hours(1));
        assert_eq!(state.expires_at, start() + Duration::minutes(10));
    }

    #[test]
    fn test_issued_tokens_are_url_safe_and_long_enough() {
        let issuer = TokenIssuer::new(TokenWindows::default(), Arc::new(ManualClock::new(start())));

        let token = issuer.issue(TokenKind::EmailVerification);

        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(token.value.len(), 43);
        assert!(token
            .value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_issue_draws_fresh_entropy_each_time() {
        let issuer = TokenIssuer::new(TokenWindows::default(), Arc::new(ManualClock::new(start())))
            .with_entropy(Arc::new(SequentialEntropy(AtomicU8::new(0))));

        let first = issuer.issue(TokenKind::PasswordReset);
        let second = issuer.issue(TokenKind::PasswordReset);

        assert_ne!(first.value, second.value);
    }

    #[test]
    fn test_validate_exact_match_before_expiry_is_valid() {
        let expires_at = start() + Duration::hours(1);
        let result = TokenIssuer::validate(Some("abc"), Some(expires_at), "abc", start());
        assert_eq!(result, TokenValidation::Valid);
    }

    #[test]
    fn test_validate_exact_match_at_or_after_expiry_is_expired() {
        let expires_at = start() + Duration::hours(1);

        let at_boundary = TokenIssuer::validate(Some("abc"), Some(expires_at), "abc", expires_at);
        let after = TokenIssuer::validate(
            Some("abc"),
            Some(expires_at),
            "abc",
            expires_at + Duration::seconds(1),
        );

        assert_eq!(at_boundary, TokenValidation::Expired);
        assert_eq!(after, TokenValidation::Expired);
    }

    #[test]
    fn test_validate_mismatch_wins_over_expiry() {
        let expires_at = start() - Duration::hours(1);
        let result = TokenIssuer::validate(Some("abc"), Some(expires_at), "abd", start());
        assert_eq!(result, TokenValidation::Mismatch);
    }

    #[test]
    fn test_validate_without_stored_token_is_mismatch() {
        assert_eq!(
            TokenIssuer::validate(None, None, "abc", start()),
            TokenValidation::Mismatch
        );
        assert_eq!(
            TokenIssuer::validate(None, None, "", start()),
            TokenValidation::Mismatch
        );
        assert_eq!(
            TokenIssuer::validate(Some("abc"), None, "abc", start()),
            TokenValidation::Mismatch
        );
    }

    #[test]
    fn test_check_follows_clock() {
        let clock = Arc::new(ManualClock::new(start()));
        let issuer = TokenIssuer::new(TokenWindows::default(), clock.clone());
        let token = issuer.issue(TokenKind::PasswordReset);

        assert_eq!(issuer.check(Some(&token), &token.value), TokenValidation::Valid);

        clock.advance(Duration::minutes(61));
        assert_eq!(issuer.check(Some(&token), &token.value), TokenValidation::Expired);
        assert_eq!(issuer.check(None, &token.value), TokenValidation::Mismatch);
    }

    #[test]
    fn test_debug_output_hides_token_value() {
        let token = IssuedToken::new("super-secret", start());
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("redacted"));
    }
}
