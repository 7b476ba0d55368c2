use std::sync::Arc;
use std::time::Duration;

use account_service::account::models::EmailAddress;
use account_service::account::ports::Notifier;
use account_service::account::ports::UserRepository;
use account_service::account::service::AccountService;
use account_service::account::service::AccountSettings;
use account_service::config::Config;
use account_service::inbound::http::router::create_router;
use account_service::oauth::ports::AuthorizationServer;
use account_service::oauth::ports::OAuthTokenRepository;
use account_service::oauth::service::OAuthSettings;
use account_service::oauth::service::OAuthTokenManager;
use account_service::outbound::notifier::HttpNotifier;
use account_service::outbound::provider::HttpAuthorizationServer;
use account_service::repositories::memory::MemoryOAuthTokenRepository;
use account_service::repositories::memory::MemoryRoleRepository;
use account_service::repositories::memory::MemoryUserRepository;
use account_service::repositories::postgres::PostgresOAuthTokenRepository;
use account_service::repositories::postgres::PostgresRoleRepository;
use account_service::repositories::postgres::PostgresUserRepository;
use account_service::role::models::RoleId;
use account_service::role::ports::RoleRepository;
use account_service::role::service::RoleAuthorizer;
use auth::Authenticator;
use auth::Clock;
use auth::SessionLifetimes;
use auth::SystemClock;
use auth::TokenIssuer;
use auth::TokenWindows;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    let storage = if config.database.url.is_some() {
        "postgresql"
    } else {
        "memory"
    };
    tracing::info!(
        http_port = config.server.http_port,
        storage,
        providers = config.oauth.providers.len(),
        notifier_endpoint = %config.notifier.endpoint,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens = Arc::new(TokenIssuer::new(
        TokenWindows {
            email_verification: chrono::Duration::hours(config.tokens.verification_window_hours),
            password_reset: chrono::Duration::minutes(config.tokens.reset_window_minutes),
            oauth_state: chrono::Duration::minutes(config.tokens.oauth_state_window_minutes),
        },
        Arc::clone(&clock),
    ));
    let authenticator = Arc::new(
        Authenticator::new(config.jwt.secret.as_bytes())
            .with_lifetimes(SessionLifetimes {
                standard: chrono::Duration::hours(config.jwt.expiration_hours),
                remember_me: chrono::Duration::hours(config.jwt.remember_me_hours),
            })
            .with_clock(Arc::clone(&clock)),
    );

    let notifier = Arc::new(HttpNotifier::new(&config.notifier, &config.links)?);
    let authorization_server = Arc::new(HttpAuthorizationServer::new(&config.oauth)?);

    let services = Services {
        notifier,
        authorization_server,
        tokens,
        authenticator,
        clock,
        account_settings: account_settings(&config)?,
        oauth_settings: OAuthSettings {
            refresh_buffer: chrono::Duration::seconds(config.oauth.refresh_buffer_seconds),
            request_timeout: Duration::from_secs(config.oauth.request_timeout_seconds),
        },
    };

    let http_application = match &config.database.url {
        Some(database_url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(database_url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            services.into_router(
                Arc::new(PostgresUserRepository::new(pg_pool.clone())),
                Arc::new(PostgresRoleRepository::new(pg_pool.clone())),
                Arc::new(PostgresOAuthTokenRepository::new(pg_pool)),
            )
        }
        None => {
            tracing::warn!("No database configured, accounts are kept in memory only");
            services.into_router(
                Arc::new(MemoryUserRepository::new()),
                Arc::new(MemoryRoleRepository::with_default_roles()),
                Arc::new(MemoryOAuthTokenRepository::new()),
            )
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    if let Err(e) = axum::serve(http_listener, http_application).await {
        tracing::error!(error = %e, "Server error");
    }

    Ok(())
}

fn account_settings(config: &Config) -> Result<AccountSettings, anyhow::Error> {
    let admin_emails = config
        .roles
        .admin_emails
        .iter()
        .map(|email| EmailAddress::new(email.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AccountSettings {
        default_role: RoleId::new(config.roles.default_role.clone())?,
        admin_emails,
        notify_timeout: Duration::from_secs(config.notifier.timeout_seconds),
    })
}

/// Storage-independent pieces of the application.
struct Services<N, AS> {
    notifier: Arc<N>,
    authorization_server: Arc<AS>,
    tokens: Arc<TokenIssuer>,
    authenticator: Arc<Authenticator>,
    clock: Arc<dyn Clock>,
    account_settings: AccountSettings,
    oauth_settings: OAuthSettings,
}

impl<N, AS> Services<N, AS>
where
    N: Notifier,
    AS: AuthorizationServer,
{
    fn into_router<UR, RR, TR>(
        self,
        user_repository: Arc<UR>,
        role_repository: Arc<RR>,
        token_repository: Arc<TR>,
    ) -> Router
    where
        UR: UserRepository,
        RR: RoleRepository,
        TR: OAuthTokenRepository,
    {
        let role_service = Arc::new(RoleAuthorizer::new(role_repository, self.clock));
        let account_service = Arc::new(AccountService::new(
            user_repository,
            self.notifier,
            Arc::clone(&role_service),
            Arc::clone(&self.tokens),
            self.account_settings,
        ));
        let oauth_service = Arc::new(OAuthTokenManager::new(
            token_repository,
            self.authorization_server,
            self.tokens,
            self.oauth_settings,
        ));

        create_router(
            account_service,
            role_service,
            oauth_service,
            self.authenticator,
        )
    }
}
