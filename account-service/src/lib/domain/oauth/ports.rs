use async_trait::async_trait;

use crate::domain::account::models::UserId;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::oauth::errors::ProviderError;
use crate::domain::oauth::models::LinkStatus;
use crate::domain::oauth::models::OAuthTokenRecord;
use crate::domain::oauth::models::ProviderName;
use crate::domain::oauth::models::ProviderTokens;

/// Port for linking and using third-party provider accounts.
#[async_trait]
pub trait OAuthServicePort: Send + Sync + 'static {
    /// Build the provider consent URL carrying a fresh state bound to
    /// (`user_id`, `provider`).
    ///
    /// # Errors
    /// * `UnknownProvider` - Provider is not configured
    async fn authorization_url(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<String, OAuthError>;

    /// Finish the consent flow: check the state when one is presented, then
    /// exchange the code.
    ///
    /// # Errors
    /// * `InvalidState` - State unknown, expired or bound to another link
    /// * `ExternalService` - Provider exchange failed
    async fn handle_callback(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
        code: &str,
        state: Option<&str>,
    ) -> Result<OAuthTokenRecord, OAuthError>;

    /// Exchange a one-time authorization code and overwrite the stored record.
    ///
    /// # Errors
    /// * `ExternalService` - Provider exchange failed; any prior record is kept
    /// * `UnknownProvider` - Provider is not configured
    async fn exchange_authorization_code(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
        code: &str,
    ) -> Result<OAuthTokenRecord, OAuthError>;

    /// Access token that is valid for at least the refresh buffer, refreshing
    /// first when needed. Concurrent callers share one provider round-trip.
    ///
    /// # Errors
    /// * `NotLinked` - No record for the pair
    /// * `ReauthorizationRequired` - Refresh token rejected by the provider
    /// * `ExternalService` - Provider unavailable
    async fn get_valid_access_token(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<String, OAuthError>;

    /// Refresh the pair unconditionally.
    ///
    /// # Errors
    /// Same as [`OAuthServicePort::get_valid_access_token`]
    async fn refresh(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<OAuthTokenRecord, OAuthError>;

    /// Whether the pair is linked, refreshing it if due.
    async fn status(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<LinkStatus, OAuthError>;

    /// Remove the link.
    ///
    /// # Returns
    /// True when a record was removed
    async fn disconnect(&self, user_id: &UserId, provider: &ProviderName)
        -> Result<bool, OAuthError>;
}

/// Persistence for provider token records, keyed by (user, provider).
#[async_trait]
pub trait OAuthTokenRepository: Send + Sync + 'static {
    async fn find(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<Option<OAuthTokenRecord>, OAuthError>;

    /// Insert or wholly replace the record for its (user, provider).
    async fn upsert(&self, record: OAuthTokenRecord) -> Result<OAuthTokenRecord, OAuthError>;

    /// # Returns
    /// True when a record was removed
    async fn delete(&self, user_id: &UserId, provider: &ProviderName) -> Result<bool, OAuthError>;
}

/// External authorization server speaking the OAuth2 code and refresh grants.
#[async_trait]
pub trait AuthorizationServer: Send + Sync + 'static {
    /// Consent URL for `provider` carrying `state`.
    ///
    /// # Errors
    /// * `UnknownProvider` - Provider is not configured
    fn authorization_url(&self, provider: &ProviderName, state: &str)
        -> Result<String, ProviderError>;

    async fn exchange_code(
        &self,
        provider: &ProviderName,
        code: &str,
    ) -> Result<ProviderTokens, ProviderError>;

    async fn refresh(
        &self,
        provider: &ProviderName,
        refresh_token: &str,
    ) -> Result<ProviderTokens, ProviderError>;
}
