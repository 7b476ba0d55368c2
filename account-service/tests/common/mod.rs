use std::sync::Arc;
use std::time::Duration;

use account_service::account::errors::NotifierError;
use account_service::account::notifications::Notification;
use account_service::account::ports::Notifier;
use account_service::account::service::AccountService;
use account_service::account::service::AccountSettings;
use account_service::account::models::EmailAddress;
use account_service::inbound::http::router::create_router;
use account_service::oauth::errors::ProviderError;
use account_service::oauth::models::ProviderName;
use account_service::oauth::models::ProviderTokens;
use account_service::oauth::ports::AuthorizationServer;
use account_service::oauth::service::OAuthSettings;
use account_service::oauth::service::OAuthTokenManager;
use account_service::repositories::memory::MemoryOAuthTokenRepository;
use account_service::repositories::memory::MemoryRoleRepository;
use account_service::repositories::memory::MemoryUserRepository;
use account_service::role::models::RoleId;
use account_service::role::service::RoleAuthorizer;
use async_trait::async_trait;
use auth::Authenticator;
use auth::Clock;
use auth::SystemClock;
use auth::TokenIssuer;
use auth::TokenWindows;
use serde_json::json;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const STRONG_PASSWORD: &str = "Passw0rd!";
pub const LINKING_CODE: &str = "valid-code";

/// Test application that spawns a real server on in-memory storage
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    inbox: Mutex<mpsc::UnboundedReceiver<Notification>>,
}

/// Notifier that forwards every notice to the test.
struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        self.sender
            .send(notification.clone())
            .map_err(|e| NotifierError::DeliveryFailed(e.to_string()))
    }
}

/// Authorization server that accepts exactly one code.
struct ScriptedAuthorizationServer;

#[async_trait]
impl AuthorizationServer for ScriptedAuthorizationServer {
    fn authorization_url(
        &self,
        provider: &ProviderName,
        state: &str,
    ) -> Result<String, ProviderError> {
        Ok(format!(
            "https://{}.example.com/authorize?client_id=test&state={}",
            provider, state
        ))
    }

    async fn exchange_code(
        &self,
        _provider: &ProviderName,
        code: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        if code == LINKING_CODE {
            Ok(ProviderTokens {
                access_token: "provider-access".to_string(),
                refresh_token: Some("provider-refresh".to_string()),
                expires_in: 3600,
            })
        } else {
            Err(ProviderError::InvalidGrant("invalid authorization code".to_string()))
        }
    }

    async fn refresh(
        &self,
        _provider: &ProviderName,
        _refresh_token: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        Ok(ProviderTokens {
            access_token: "provider-access-refreshed".to_string(),
            refresh_token: None,
            expires_in: 3600,
        })
    }
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens = Arc::new(TokenIssuer::new(
            TokenWindows {
                email_verification: chrono::Duration::hours(24),
                password_reset: chrono::Duration::minutes(60),
                oauth_state: chrono::Duration::minutes(10),
            },
            Arc::clone(&clock),
        ));

        let (sender, inbox) = mpsc::unbounded_channel();

        let role_service = Arc::new(RoleAuthorizer::new(
            Arc::new(MemoryRoleRepository::with_default_roles()),
            Arc::clone(&clock),
        ));
        let account_service = Arc::new(AccountService::new(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(ChannelNotifier { sender }),
            Arc::clone(&role_service),
            Arc::clone(&tokens),
            AccountSettings {
                default_role: RoleId::new("user").unwrap(),
                admin_emails: vec![EmailAddress::new(ADMIN_EMAIL.to_string()).unwrap()],
                notify_timeout: Duration::from_secs(2),
            },
        ));
        let oauth_service = Arc::new(OAuthTokenManager::new(
            Arc::new(MemoryOAuthTokenRepository::new()),
            Arc::new(ScriptedAuthorizationServer),
            tokens,
            OAuthSettings {
                refresh_buffer: chrono::Duration::seconds(60),
                request_timeout: Duration::from_secs(2),
            },
        ));

        let authenticator = Arc::new(
            Authenticator::new(b"test-secret-key-for-jwt-signing-at-least-32-bytes")
                .with_clock(clock),
        );

        let router = create_router(account_service, role_service, oauth_service, authenticator);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create reqwest client"),
            inbox: Mutex::new(inbox),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make DELETE request with Bearer token
    pub fn delete_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .delete(&format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Next notice handed to the notifier.
    pub async fn next_notification(&self) -> Notification {
        let mut inbox = self.inbox.lock().await;
        tokio::time::timeout(Duration::from_secs(5), inbox.recv())
            .await
            .expect("Timed out waiting for a notification")
            .expect("Notifier channel closed")
    }

    pub async fn register(&self, email: &str, username: &str) -> reqwest::Response {
        self.post("/api/account/register")
            .json(&json!({
                "email": email,
                "username": username,
                "password": STRONG_PASSWORD,
                "birthYear": 1990
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/account/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register, confirm and log in. Returns (user id, session token).
    pub async fn create_confirmed_user(&self, email: &str, username: &str) -> (String, String) {
        let response = self.register(email, username).await;
        assert_eq!(response.status(), 201);

        let (user_id, token) = match self.next_notification().await {
            Notification::VerifyEmail { user_id, token, .. } => (user_id.to_string(), token),
            other => panic!("Expected a verification notice, got {}", other.kind()),
        };

        let response = self
            .post("/api/account/confirm-email")
            .json(&json!({ "userId": user_id, "token": token }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), 200);

        let body: Value = self.login(email, STRONG_PASSWORD).await.json().await.unwrap();
        let session = body["token"]
            .as_str()
            .expect("Login response carries a token")
            .to_string();

        (user_id, session)
    }
}
