use std::collections::HashMap;
use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub tokens: TokensConfig,
    pub oauth: OAuthConfig,
    pub notifier: NotifierConfig,
    pub links: LinksConfig,
    pub roles: RolesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Postgres settings. Without a URL the service runs on in-memory storage.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub remember_me_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokensConfig {
    pub verification_window_hours: i64,
    pub reset_window_minutes: i64,
    pub oauth_state_window_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OAuthConfig {
    pub refresh_buffer_seconds: i64,
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Client registration with one OAuth provider.
#[derive(Deserialize, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
}

/// Front-end URLs embedded in notification links.
#[derive(Debug, Deserialize, Clone)]
pub struct LinksConfig {
    pub confirm_email_url: String,
    pub reset_password_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RolesConfig {
    pub default_role: String,
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (ACCOUNT_DATABASE__URL, ACCOUNT_SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // ACCOUNT_OAUTH__PROVIDERS__SPOTIFY__CLIENT_SECRET=... overrides oauth.providers.spotify.client_secret
            .add_source(
                Environment::with_prefix("ACCOUNT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("roles.admin_emails"),
            )
            .build()?;

        configuration.try_deserialize()
    }
}
