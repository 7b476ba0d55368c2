use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::domain::oauth::errors::ProviderError;
use crate::domain::oauth::models::ProviderName;
use crate::domain::oauth::models::ProviderTokens;
use crate::domain::oauth::ports::AuthorizationServer;

/// Client registration for one provider, with URLs parsed up front.
struct ProviderEndpoint {
    client_id: String,
    client_secret: String,
    authorize_url: Url,
    token_url: Url,
    redirect_uri: String,
    scopes: Vec<String>,
}

/// OAuth2 authorization server adapter for the configured providers.
///
/// Token requests use HTTP Basic client authentication and a form body.
pub struct HttpAuthorizationServer {
    client: reqwest::Client,
    providers: HashMap<ProviderName, ProviderEndpoint>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

impl HttpAuthorizationServer {
    /// # Errors
    /// Fails when a provider name or URL in the configuration is invalid.
    pub fn new(config: &OAuthConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        let mut providers = HashMap::new();
        for (name, provider) in &config.providers {
            providers.insert(
                ProviderName::new(name)?,
                ProviderEndpoint {
                    client_id: provider.client_id.clone(),
                    client_secret: provider.client_secret.clone(),
                    authorize_url: Url::parse(&provider.authorize_url)?,
                    token_url: Url::parse(&provider.token_url)?,
                    redirect_uri: provider.redirect_uri.clone(),
                    scopes: provider.scopes.clone(),
                },
            );
        }

        tracing::info!(
            providers = ?providers.keys().map(ProviderName::as_str).collect::<Vec<_>>(),
            "Authorization server adapter initialized"
        );

        Ok(Self { client, providers })
    }

    fn endpoint(&self, provider: &ProviderName) -> Result<&ProviderEndpoint, ProviderError> {
        self.providers
            .get(provider)
            .ok_or_else(|| ProviderError::UnknownProvider(provider.to_string()))
    }

    async fn token_request(
        &self,
        provider: &ProviderName,
        form: &[(&str, &str)],
    ) -> Result<ProviderTokens, ProviderError> {
        let endpoint = self.endpoint(provider)?;

        let response = self
            .client
            .post(endpoint.token_url.clone())
            .basic_auth(&endpoint.client_id, Some(&endpoint.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Transient(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let tokens: TokenResponse =
            serde_json::from_str(&body).map_err(|_| ProviderError::Rejected {
                status: status.as_u16(),
                message: "malformed token response".to_string(),
            })?;

        Ok(ProviderTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        })
    }
}

/// Classify a non-success token endpoint response.
///
/// `invalid_grant` on 400/401 means the code or refresh token is dead; 429 and
/// 5xx are worth retrying; anything else is a plain rejection.
fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<TokenErrorResponse>(body).ok();

    if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
        if let Some(error) = parsed.as_ref().filter(|e| e.error == "invalid_grant") {
            return ProviderError::InvalidGrant(
                error
                    .error_description
                    .clone()
                    .unwrap_or_else(|| error.error.clone()),
            );
        }
    }

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::Transient(format!("provider answered {status}"));
    }

    ProviderError::Rejected {
        status: status.as_u16(),
        message: parsed
            .map(|e| e.error)
            .unwrap_or_else(|| status.to_string()),
    }
}

#[async_trait]
impl AuthorizationServer for HttpAuthorizationServer {
    fn authorization_url(
        &self,
        provider: &ProviderName,
        state: &str,
    ) -> Result<String, ProviderError> {
        let endpoint = self.endpoint(provider)?;
        let mut url = endpoint.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &endpoint.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &endpoint.redirect_uri)
            .append_pair("scope", &endpoint.scopes.join(" "))
            .append_pair("show_dialog", "true")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        provider: &ProviderName,
        code: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let redirect_uri = self.endpoint(provider)?.redirect_uri.clone();
        self.token_request(
            provider,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
            ],
        )
        .await
    }

    async fn refresh(
        &self,
        provider: &ProviderName,
        refresh_token: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        self.token_request(
            provider,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::Form;
    use axum::Json;
    use axum::Router;
    use serde_json::json;

    use super::*;
    use crate::config::ProviderConfig;

    fn config(token_url: &str) -> OAuthConfig {
        let mut providers = HashMap::new();
        providers.insert(
            "spotify".to_string(),
            ProviderConfig {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                authorize_url: "https://accounts.example.com/authorize".to_string(),
                token_url: token_url.to_string(),
                redirect_uri: "https://app.example.com/callback".to_string(),
                scopes: vec!["user-read-email".to_string(), "playlist-read".to_string()],
            },
        );
        OAuthConfig {
            refresh_buffer_seconds: 60,
            request_timeout_seconds: 5,
            providers,
        }
    }

    /// Token endpoint that accepts refresh token `good` only.
    async fn spawn_token_endpoint() -> String {
        async fn token(
            headers: HeaderMap,
            Form(form): Form<HashMap<String, String>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            // base64("client:secret")
            if headers.get("authorization").and_then(|v| v.to_str().ok())
                != Some("Basic Y2xpZW50OnNlY3JldA==")
            {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "invalid_client" })),
                );
            }
            match form.get("refresh_token").map(String::as_str) {
                Some("good") => (
                    StatusCode::OK,
                    Json(json!({ "access_token": "fresh", "expires_in": 3600 })),
                ),
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_grant",
                        "error_description": "Refresh token revoked"
                    })),
                ),
            }
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/token", post(token)))
                .await
                .unwrap();
        });
        format!("http://{address}/token")
    }

    fn spotify() -> ProviderName {
        ProviderName::new("spotify").unwrap()
    }

    #[test]
    fn test_classify_invalid_grant() {
        let error = classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#,
        );
        assert!(matches!(error, ProviderError::InvalidGrant(ref d) if d == "Refresh token revoked"));
    }

    #[test]
    fn test_classify_server_error_is_transient() {
        assert!(classify_error(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(classify_error(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
    }

    #[test]
    fn test_classify_other_rejection() {
        let error = classify_error(StatusCode::BAD_REQUEST, r#"{"error":"invalid_request"}"#);
        assert!(matches!(
            error,
            ProviderError::Rejected { status: 400, ref message } if message == "invalid_request"
        ));
    }

    #[test]
    fn test_authorization_url_carries_parameters() {
        let server = HttpAuthorizationServer::new(&config("https://accounts.example.com/api/token"))
            .unwrap();

        let url = Url::parse(&server.authorization_url(&spotify(), "state-123").unwrap()).unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.example.com"));
        assert_eq!(params["client_id"], "client");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["redirect_uri"], "https://app.example.com/callback");
        assert_eq!(params["scope"], "user-read-email playlist-read");
        assert_eq!(params["show_dialog"], "true");
        assert_eq!(params["state"], "state-123");
    }

    #[test]
    fn test_unknown_provider() {
        let server = HttpAuthorizationServer::new(&config("https://accounts.example.com/api/token"))
            .unwrap();

        let result = server.authorization_url(&ProviderName::new("deezer").unwrap(), "state");

        assert!(matches!(result, Err(ProviderError::UnknownProvider(_))));
    }

    #[tokio::test]
    async fn test_refresh_against_token_endpoint() {
        let token_url = spawn_token_endpoint().await;
        let server = HttpAuthorizationServer::new(&config(&token_url)).unwrap();

        let tokens = server.refresh(&spotify(), "good").await.unwrap();
        assert_eq!(tokens.access_token, "fresh");
        assert_eq!(tokens.refresh_token, None);
        assert_eq!(tokens.expires_in, 3600);

        let revoked = server.refresh(&spotify(), "revoked").await;
        assert!(matches!(revoked, Err(ProviderError::InvalidGrant(_))));
    }
}
