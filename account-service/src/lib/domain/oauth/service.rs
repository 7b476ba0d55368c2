use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use async_trait::async_trait;
use auth::IssuedToken;
use auth::TokenIssuer;
use auth::TokenKind;
use auth::TokenValidation;
use futures::future::BoxFuture;
use futures::future::Shared;
use futures::FutureExt;

use crate::domain::account::models::UserId;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::oauth::errors::ProviderError;
use crate::domain::oauth::models::LinkStatus;
use crate::domain::oauth::models::OAuthTokenRecord;
use crate::domain::oauth::models::ProviderName;
use crate::domain::oauth::ports::AuthorizationServer;
use crate::domain::oauth::ports::OAuthServicePort;
use crate::domain::oauth::ports::OAuthTokenRepository;

/// Provider attempts per refresh; only transient failures are retried.
const MAX_REFRESH_ATTEMPTS: u32 = 2;

type RecordKey = (UserId, ProviderName);
type RefreshFuture = Shared<BoxFuture<'static, Result<OAuthTokenRecord, OAuthError>>>;

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// Margin before expiry at which an access token is refreshed.
    pub refresh_buffer: chrono::Duration,
    /// Upper bound on a single provider request.
    pub request_timeout: Duration,
}

/// Manages provider token pairs per (user, provider).
///
/// Refreshes are single-flight: the first caller that needs one registers a
/// shared future under the pair's key and every concurrent caller awaits that
/// same future. The entry is removed when the refresh settles, so the next
/// caller re-reads the stored record. Distinct pairs never contend.
pub struct OAuthTokenManager<TR, AS>
where
    TR: OAuthTokenRepository,
    AS: AuthorizationServer,
{
    repository: Arc<TR>,
    server: Arc<AS>,
    tokens: Arc<TokenIssuer>,
    settings: OAuthSettings,
    in_flight: Arc<Mutex<HashMap<RecordKey, RefreshFuture>>>,
    pending_states: Mutex<HashMap<RecordKey, IssuedToken>>,
}

impl<TR, AS> OAuthTokenManager<TR, AS>
where
    TR: OAuthTokenRepository,
    AS: AuthorizationServer,
{
    pub fn new(
        repository: Arc<TR>,
        server: Arc<AS>,
        tokens: Arc<TokenIssuer>,
        settings: OAuthSettings,
    ) -> Self {
        Self {
            repository,
            server,
            tokens,
            settings,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            pending_states: Mutex::new(HashMap::new()),
        }
    }

    /// Join the refresh in flight for the pair, or start one.
    async fn refresh_single_flight(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
        force: bool,
    ) -> Result<OAuthTokenRecord, OAuthError> {
        let key = (*user_id, provider.clone());

        let refresh = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::debug!(user_id = %user_id, provider = %provider, "Joining in-flight refresh");
                    existing.clone()
                }
                None => {
                    let task = run_refresh(
                        Arc::clone(&self.repository),
                        Arc::clone(&self.server),
                        Arc::clone(&self.tokens),
                        self.settings.clone(),
                        key.clone(),
                        force,
                    );
                    let settled = Settled {
                        registry: Arc::clone(&self.in_flight),
                        key: key.clone(),
                    };
                    let shared = async move {
                        let _settled = settled;
                        task.await
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, shared.clone());
                    shared
                }
            }
        };

        refresh.await
    }

    async fn valid_record(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<OAuthTokenRecord, OAuthError> {
        let record = self
            .repository
            .find(user_id, provider)
            .await?
            .ok_or_else(|| OAuthError::NotLinked(provider.to_string()))?;

        if record.needs_refresh(self.tokens.now(), self.settings.refresh_buffer) {
            self.refresh_single_flight(user_id, provider, false).await
        } else {
            Ok(record)
        }
    }

    /// A callback without `state` is only accepted for a pair that has no
    /// outstanding authorization URL.
    fn require_no_pending_state(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<(), OAuthError> {
        if lock(&self.pending_states).contains_key(&(*user_id, provider.clone())) {
            tracing::warn!(user_id = %user_id, provider = %provider, "Callback omitted issued state");
            return Err(OAuthError::InvalidState);
        }
        Ok(())
    }

    fn consume_state(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
        presented: &str,
    ) -> Result<(), OAuthError> {
        let key = (*user_id, provider.clone());
        let mut pending = lock(&self.pending_states);

        match self.tokens.check(pending.get(&key), presented) {
            TokenValidation::Valid => {
                pending.remove(&key);
                Ok(())
            }
            TokenValidation::Expired => {
                pending.remove(&key);
                Err(OAuthError::InvalidState)
            }
            TokenValidation::Mismatch => Err(OAuthError::InvalidState),
        }
    }
}

/// Drops the pair's in-flight entry once its refresh finishes, fails or
/// unwinds.
struct Settled {
    registry: Arc<Mutex<HashMap<RecordKey, RefreshFuture>>>,
    key: RecordKey,
}

impl Drop for Settled {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn bounded<F>(timeout: Duration, call: F) -> Result<F::Output, ProviderError>
where
    F: Future,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ProviderError::Timeout)
}

/// One refresh round for `key`: re-read, skip if another flight already
/// refreshed, call the provider, store the replacement.
async fn run_refresh<TR, AS>(
    repository: Arc<TR>,
    server: Arc<AS>,
    tokens: Arc<TokenIssuer>,
    settings: OAuthSettings,
    key: RecordKey,
    force: bool,
) -> Result<OAuthTokenRecord, OAuthError>
where
    TR: OAuthTokenRepository,
    AS: AuthorizationServer,
{
    let (user_id, provider) = &key;

    let record = repository
        .find(user_id, provider)
        .await?
        .ok_or_else(|| OAuthError::NotLinked(provider.to_string()))?;

    if !force && !record.needs_refresh(tokens.now(), settings.refresh_buffer) {
        return Ok(record);
    }

    let Some(refresh_token) = record.refresh_token.clone() else {
        tracing::warn!(user_id = %user_id, provider = %provider, "No refresh token on record");
        return Err(OAuthError::ReauthorizationRequired(
            "no refresh token stored".to_string(),
        ));
    };

    let mut attempt = 1;
    let fresh = loop {
        let outcome = bounded(
            settings.request_timeout,
            server.refresh(provider, &refresh_token),
        )
        .await
        .and_then(|result| result);

        match outcome {
            Ok(fresh) => break fresh,
            Err(e) if e.is_transient() && attempt < MAX_REFRESH_ATTEMPTS => {
                tracing::warn!(
                    user_id = %user_id,
                    provider = %provider,
                    attempt,
                    error = %e,
                    "Token refresh failed, retrying"
                );
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    provider = %provider,
                    error = %e,
                    "Token refresh failed"
                );
                return Err(OAuthError::from_refresh(e));
            }
        }
    };

    let now = tokens.now();
    let expires_at = fresh.expires_at(now).map_err(|e| {
        tracing::warn!(
            user_id = %user_id,
            provider = %provider,
            error = %e,
            "Refreshed token has unusable lifetime"
        );
        OAuthError::from_refresh(e)
    })?;
    let refreshed = OAuthTokenRecord {
        user_id: *user_id,
        provider: provider.clone(),
        access_token: fresh.access_token,
        refresh_token: fresh.refresh_token.or(record.refresh_token),
        expires_at,
        created_at: record.created_at,
        updated_at: now,
    };

    let stored = repository.upsert(refreshed).await?;
    tracing::info!(
        user_id = %user_id,
        provider = %provider,
        expires_at = %stored.expires_at,
        "Provider token refreshed"
    );
    Ok(stored)
}

#[async_trait]
impl<TR, AS> OAuthServicePort for OAuthTokenManager<TR, AS>
where
    TR: OAuthTokenRepository,
    AS: AuthorizationServer,
{
    async fn authorization_url(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<String, OAuthError> {
        let state = self.tokens.issue(TokenKind::OAuthState);
        let url = self
            .server
            .authorization_url(provider, &state.value)
            .map_err(OAuthError::from_exchange)?;

        lock(&self.pending_states).insert((*user_id, provider.clone()), state);
        tracing::debug!(user_id = %user_id, provider = %provider, "Authorization state issued");
        Ok(url)
    }

    async fn handle_callback(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
        code: &str,
        state: Option<&str>,
    ) -> Result<OAuthTokenRecord, OAuthError> {
        match state {
            Some(state) => self.consume_state(user_id, provider, state)?,
            None => self.require_no_pending_state(user_id, provider)?,
        }
        self.exchange_authorization_code(user_id, provider, code)
            .await
    }

    async fn exchange_authorization_code(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
        code: &str,
    ) -> Result<OAuthTokenRecord, OAuthError> {
        let fresh = bounded(
            self.settings.request_timeout,
            self.server.exchange_code(provider, code),
        )
        .await
        .and_then(|result| result)
        .map_err(|e| {
            tracing::warn!(
                user_id = %user_id,
                provider = %provider,
                error = %e,
                "Authorization code exchange failed"
            );
            OAuthError::from_exchange(e)
        })?;

        let now = self.tokens.now();
        let expires_at = fresh.expires_at(now).map_err(|e| {
            tracing::warn!(
                user_id = %user_id,
                provider = %provider,
                error = %e,
                "Exchanged token has unusable lifetime"
            );
            OAuthError::from_exchange(e)
        })?;
        let record = OAuthTokenRecord {
            user_id: *user_id,
            provider: provider.clone(),
            access_token: fresh.access_token,
            refresh_token: fresh.refresh_token,
            expires_at,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.upsert(record).await?;
        tracing::info!(user_id = %user_id, provider = %provider, "Provider account linked");
        Ok(stored)
    }

    async fn get_valid_access_token(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<String, OAuthError> {
        self.valid_record(user_id, provider)
            .await
            .map(|record| record.access_token)
    }

    async fn refresh(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<OAuthTokenRecord, OAuthError> {
        self.refresh_single_flight(user_id, provider, true).await
    }

    async fn status(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<LinkStatus, OAuthError> {
        match self.valid_record(user_id, provider).await {
            Ok(record) => Ok(LinkStatus {
                linked: true,
                expires_at: Some(record.expires_at),
            }),
            Err(OAuthError::NotLinked(_)) => Ok(LinkStatus {
                linked: false,
                expires_at: None,
            }),
            Err(e) => Err(e),
        }
    }

    async fn disconnect(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<bool, OAuthError> {
        lock(&self.pending_states).remove(&(*user_id, provider.clone()));
        let removed = self.repository.delete(user_id, provider).await?;
        if removed {
            tracing::info!(user_id = %user_id, provider = %provider, "Provider account unlinked");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use auth::Clock;
    use auth::ManualClock;
    use auth::TokenWindows;
    use chrono::DateTime;
    use chrono::TimeZone;
    use chrono::Utc;
    use mockall::mock;

    use super::*;
    use crate::domain::oauth::models::ProviderTokens;
    use crate::outbound::repositories::memory::MemoryOAuthTokenRepository;

    mock! {
        pub TestAuthorizationServer {}

        #[async_trait]
        impl AuthorizationServer for TestAuthorizationServer {
            fn authorization_url(&self, provider: &ProviderName, state: &str) -> Result<String, ProviderError>;
            async fn exchange_code(&self, provider: &ProviderName, code: &str) -> Result<ProviderTokens, ProviderError>;
            async fn refresh(&self, provider: &ProviderName, refresh_token: &str) -> Result<ProviderTokens, ProviderError>;
        }
    }

    /// Server whose refresh takes `delay` and counts calls.
    struct SlowServer {
        refresh_calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl AuthorizationServer for SlowServer {
        fn authorization_url(
            &self,
            provider: &ProviderName,
            state: &str,
        ) -> Result<String, ProviderError> {
            Ok(format!("https://{provider}.test/authorize?state={state}"))
        }

        async fn exchange_code(
            &self,
            _provider: &ProviderName,
            _code: &str,
        ) -> Result<ProviderTokens, ProviderError> {
            Ok(tokens("exchanged", Some("refresh-0"), 3600))
        }

        async fn refresh(
            &self,
            _provider: &ProviderName,
            _refresh_token: &str,
        ) -> Result<ProviderTokens, ProviderError> {
            let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            Ok(tokens(&format!("access-{call}"), None, 3600))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn spotify() -> ProviderName {
        ProviderName::new("spotify").unwrap()
    }

    fn tokens(access: &str, refresh: Option<&str>, expires_in: i64) -> ProviderTokens {
        ProviderTokens {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_in,
        }
    }

    fn settings() -> OAuthSettings {
        OAuthSettings {
            refresh_buffer: chrono::Duration::seconds(60),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn stored_record(user_id: UserId, expires_at: DateTime<Utc>) -> OAuthTokenRecord {
        OAuthTokenRecord {
            user_id,
            provider: spotify(),
            access_token: "access-old".to_string(),
            refresh_token: Some("refresh-old".to_string()),
            expires_at,
            created_at: start() - chrono::Duration::days(1),
            updated_at: start() - chrono::Duration::hours(1),
        }
    }

    fn manager<AS: AuthorizationServer>(
        server: AS,
        clock: Arc<ManualClock>,
    ) -> (
        OAuthTokenManager<MemoryOAuthTokenRepository, AS>,
        Arc<MemoryOAuthTokenRepository>,
    ) {
        let repository = Arc::new(MemoryOAuthTokenRepository::new());
        let issuer = Arc::new(TokenIssuer::new(
            TokenWindows::default(),
            clock as Arc<dyn Clock>,
        ));
        let manager =
            OAuthTokenManager::new(Arc::clone(&repository), Arc::new(server), issuer, settings());
        (manager, repository)
    }

    #[tokio::test]
    async fn test_exchange_stores_record_with_provider_expiry() {
        let mut server = MockTestAuthorizationServer::new();
        server
            .expect_exchange_code()
            .withf(|_, code| code == "auth-code")
            .times(1)
            .returning(|_, _| Ok(tokens("access-1", Some("refresh-1"), 3600)));

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();

        let record = manager
            .exchange_authorization_code(&user_id, &spotify(), "auth-code")
            .await
            .unwrap();

        assert_eq!(record.access_token, "access-1");
        assert_eq!(record.expires_at, start() + chrono::Duration::seconds(3600));
        assert_eq!(
            repository.find(&user_id, &spotify()).await.unwrap(),
            Some(record)
        );
    }

    #[tokio::test]
    async fn test_failed_exchange_keeps_prior_record() {
        let mut server = MockTestAuthorizationServer::new();
        server
            .expect_exchange_code()
            .times(1)
            .returning(|_, _| Err(ProviderError::Transient("connection reset".into())));

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();
        let prior = stored_record(user_id, start() + chrono::Duration::hours(1));
        repository.upsert(prior.clone()).await.unwrap();

        let result = manager
            .exchange_authorization_code(&user_id, &spotify(), "code")
            .await;

        assert!(matches!(result, Err(OAuthError::ExternalService(_))));
        assert_eq!(
            repository.find(&user_id, &spotify()).await.unwrap(),
            Some(prior)
        );
    }

    #[tokio::test]
    async fn test_fresh_token_returned_without_provider_call() {
        let mut server = MockTestAuthorizationServer::new();
        server.expect_refresh().times(0);

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();
        repository
            .upsert(stored_record(user_id, start() + chrono::Duration::minutes(10)))
            .await
            .unwrap();

        let token = manager
            .get_valid_access_token(&user_id, &spotify())
            .await
            .unwrap();

        assert_eq!(token, "access-old");
    }

    #[tokio::test]
    async fn test_token_inside_buffer_is_refreshed_and_keeps_refresh_token() {
        let mut server = MockTestAuthorizationServer::new();
        server
            .expect_refresh()
            .withf(|_, refresh_token| refresh_token == "refresh-old")
            .times(1)
            .returning(|_, _| Ok(tokens("access-new", None, 3600)));

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock.clone());
        let user_id = UserId::new();
        let prior = stored_record(user_id, start() + chrono::Duration::seconds(30));
        repository.upsert(prior.clone()).await.unwrap();

        let token = manager
            .get_valid_access_token(&user_id, &spotify())
            .await
            .unwrap();

        assert_eq!(token, "access-new");
        let stored = repository.find(&user_id, &spotify()).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-old"));
        assert_eq!(stored.created_at, prior.created_at);
        assert_eq!(stored.updated_at, clock.now());
        assert_eq!(stored.expires_at, start() + chrono::Duration::seconds(3600));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let server = SlowServer {
            refresh_calls: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        };
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let manager = Arc::new(manager);
        let user_id = UserId::new();
        repository
            .upsert(stored_record(user_id, start() - chrono::Duration::minutes(1)))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    manager.get_valid_access_token(&user_id, &spotify()).await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "access-1");
        }
        assert_eq!(manager.server.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(lock(&manager.in_flight).is_empty());
    }

    #[tokio::test]
    async fn test_distinct_pairs_refresh_independently() {
        let server = SlowServer {
            refresh_calls: AtomicUsize::new(0),
            delay: Duration::from_millis(20),
        };
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let alice = UserId::new();
        let bob = UserId::new();
        for user_id in [alice, bob] {
            repository
                .upsert(stored_record(user_id, start()))
                .await
                .unwrap();
        }

        let provider = spotify();
        let (a, b) = tokio::join!(
            manager.get_valid_access_token(&alice, &provider),
            manager.get_valid_access_token(&bob, &provider)
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(manager.server.refresh_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_oversized_lifetime_is_capped_on_refresh() {
        let mut server = MockTestAuthorizationServer::new();
        server
            .expect_refresh()
            .times(1)
            .returning(|_, _| Ok(tokens("access-long", None, i64::MAX)));

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();
        repository
            .upsert(stored_record(user_id, start() + chrono::Duration::seconds(30)))
            .await
            .unwrap();

        let first = manager.get_valid_access_token(&user_id, &spotify()).await;
        let second = manager.get_valid_access_token(&user_id, &spotify()).await;

        assert_eq!(first.unwrap(), "access-long");
        assert_eq!(second.unwrap(), "access-long");
        let stored = repository.find(&user_id, &spotify()).await.unwrap().unwrap();
        assert_eq!(
            stored.expires_at,
            start() + chrono::Duration::seconds(ProviderTokens::MAX_LIFETIME_SECONDS)
        );
        assert!(lock(&manager.in_flight).is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_lifetime_fails_refresh_and_keeps_record() {
        let mut server = MockTestAuthorizationServer::new();
        server
            .expect_refresh()
            .times(2)
            .returning(|_, _| Ok(tokens("access-dead", None, 0)));

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();
        let prior = stored_record(user_id, start() + chrono::Duration::seconds(30));
        repository.upsert(prior.clone()).await.unwrap();

        let first = manager.get_valid_access_token(&user_id, &spotify()).await;
        let second = manager.get_valid_access_token(&user_id, &spotify()).await;

        assert!(matches!(first, Err(OAuthError::ExternalService(_))));
        assert!(matches!(second, Err(OAuthError::ExternalService(_))));
        assert_eq!(
            repository.find(&user_id, &spotify()).await.unwrap(),
            Some(prior)
        );
        assert!(lock(&manager.in_flight).is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_lifetime_fails_exchange() {
        let mut server = MockTestAuthorizationServer::new();
        server
            .expect_exchange_code()
            .times(1)
            .returning(|_, _| Ok(tokens("access-dead", Some("refresh-1"), -5)));

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();

        let result = manager
            .exchange_authorization_code(&user_id, &spotify(), "code")
            .await;

        assert!(matches!(result, Err(OAuthError::ExternalService(_))));
        assert_eq!(repository.find(&user_id, &spotify()).await.unwrap(), None);
    }

    /// Server whose first refresh panics.
    struct PanicsOnceServer {
        refresh_calls: AtomicUsize,
    }

    #[async_trait]
    impl AuthorizationServer for PanicsOnceServer {
        fn authorization_url(
            &self,
            provider: &ProviderName,
            state: &str,
        ) -> Result<String, ProviderError> {
            Ok(format!("https://{provider}.test/authorize?state={state}"))
        }

        async fn exchange_code(
            &self,
            _provider: &ProviderName,
            _code: &str,
        ) -> Result<ProviderTokens, ProviderError> {
            Ok(tokens("exchanged", Some("refresh-0"), 3600))
        }

        async fn refresh(
            &self,
            _provider: &ProviderName,
            _refresh_token: &str,
        ) -> Result<ProviderTokens, ProviderError> {
            if self.refresh_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("adapter bug");
            }
            Ok(tokens("access-recovered", None, 3600))
        }
    }

    #[tokio::test]
    async fn test_panicked_refresh_does_not_wedge_the_pair() {
        let server = PanicsOnceServer {
            refresh_calls: AtomicUsize::new(0),
        };
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let manager = Arc::new(manager);
        let user_id = UserId::new();
        repository
            .upsert(stored_record(user_id, start()))
            .await
            .unwrap();

        let crashed = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.get_valid_access_token(&user_id, &spotify()).await })
                .await
        };
        assert!(crashed.unwrap_err().is_panic());
        assert!(lock(&manager.in_flight).is_empty());

        let token = manager
            .get_valid_access_token(&user_id, &spotify())
            .await
            .unwrap();
        assert_eq!(token, "access-recovered");
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_requires_reauthorization() {
        let mut server = MockTestAuthorizationServer::new();
        server
            .expect_refresh()
            .times(1)
            .returning(|_, _| Err(ProviderError::InvalidGrant("revoked".into())));

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();
        let prior = stored_record(user_id, start());
        repository.upsert(prior.clone()).await.unwrap();

        let result = manager.refresh(&user_id, &spotify()).await;

        assert!(matches!(
            result,
            Err(OAuthError::ReauthorizationRequired(_))
        ));
        assert_eq!(
            repository.find(&user_id, &spotify()).await.unwrap(),
            Some(prior)
        );
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&attempts);

        let mut server = MockTestAuthorizationServer::new();
        server.expect_refresh().times(2).returning(move |_, _| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ProviderError::Transient("connection reset".into()))
            } else {
                Ok(tokens("access-retry", Some("refresh-rotated"), 600))
            }
        });

        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();
        repository
            .upsert(stored_record(user_id, start()))
            .await
            .unwrap();

        let record = manager.refresh(&user_id, &spotify()).await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(record.access_token, "access-retry");
        assert_eq!(record.refresh_token.as_deref(), Some("refresh-rotated"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_surfaces_external_error() {
        let server = SlowServer {
            refresh_calls: AtomicUsize::new(0),
            delay: Duration::from_secs(60),
        };
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();
        let prior = stored_record(user_id, start());
        repository.upsert(prior.clone()).await.unwrap();

        let result = manager.get_valid_access_token(&user_id, &spotify()).await;

        assert!(matches!(result, Err(OAuthError::ExternalService(_))));
        assert_eq!(
            manager.server.refresh_calls.load(Ordering::SeqCst),
            MAX_REFRESH_ATTEMPTS as usize
        );
        assert_eq!(
            repository.find(&user_id, &spotify()).await.unwrap(),
            Some(prior)
        );
    }

    #[tokio::test]
    async fn test_unlinked_pair_is_not_found() {
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, _) = manager(MockTestAuthorizationServer::new(), clock);

        let result = manager
            .get_valid_access_token(&UserId::new(), &spotify())
            .await;
        let status = manager.status(&UserId::new(), &spotify()).await.unwrap();

        assert!(matches!(result, Err(OAuthError::NotLinked(_))));
        assert!(!status.linked);
    }

    #[tokio::test]
    async fn test_callback_state_is_bound_and_single_use() {
        let server = SlowServer {
            refresh_calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        };
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, _) = manager(server, clock);
        let user_id = UserId::new();

        let url = manager.authorization_url(&user_id, &spotify()).await.unwrap();
        let state = url.split("state=").nth(1).unwrap().to_string();

        let other_user = manager
            .handle_callback(&UserId::new(), &spotify(), "code", Some(&state))
            .await;
        assert!(matches!(other_user, Err(OAuthError::InvalidState)));

        let linked = manager
            .handle_callback(&user_id, &spotify(), "code", Some(&state))
            .await
            .unwrap();
        assert_eq!(linked.access_token, "exchanged");

        let replay = manager
            .handle_callback(&user_id, &spotify(), "code", Some(&state))
            .await;
        assert!(matches!(replay, Err(OAuthError::InvalidState)));
    }

    #[tokio::test]
    async fn test_callback_without_state_is_rejected_once_url_issued() {
        let server = SlowServer {
            refresh_calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        };
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(server, clock);
        let user_id = UserId::new();

        let url = manager.authorization_url(&user_id, &spotify()).await.unwrap();
        let state = url.split("state=").nth(1).unwrap().to_string();

        let stateless = manager
            .handle_callback(&user_id, &spotify(), "code", None)
            .await;
        assert!(matches!(stateless, Err(OAuthError::InvalidState)));
        assert_eq!(repository.find(&user_id, &spotify()).await.unwrap(), None);

        let linked = manager
            .handle_callback(&user_id, &spotify(), "code", Some(&state))
            .await
            .unwrap();
        assert_eq!(linked.access_token, "exchanged");
    }

    #[tokio::test]
    async fn test_callback_without_state_links_when_none_issued() {
        let server = SlowServer {
            refresh_calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        };
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, _) = manager(server, clock);

        let linked = manager
            .handle_callback(&UserId::new(), &spotify(), "code", None)
            .await
            .unwrap();

        assert_eq!(linked.access_token, "exchanged");
    }

    #[tokio::test]
    async fn test_expired_state_is_rejected() {
        let server = SlowServer {
            refresh_calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        };
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, _) = manager(server, clock.clone());
        let user_id = UserId::new();

        let url = manager.authorization_url(&user_id, &spotify()).await.unwrap();
        let state = url.split("state=").nth(1).unwrap().to_string();
        clock.advance(chrono::Duration::minutes(10));

        let result = manager
            .handle_callback(&user_id, &spotify(), "code", Some(&state))
            .await;

        assert!(matches!(result, Err(OAuthError::InvalidState)));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let clock = Arc::new(ManualClock::new(start()));
        let (manager, repository) = manager(MockTestAuthorizationServer::new(), clock);
        let user_id = UserId::new();
        repository
            .upsert(stored_record(user_id, start() + chrono::Duration::hours(1)))
            .await
            .unwrap();

        assert!(manager.disconnect(&user_id, &spotify()).await.unwrap());
        assert!(!manager.disconnect(&user_id, &spotify()).await.unwrap());
        assert!(!manager.status(&user_id, &spotify()).await.unwrap().linked);
    }
}
