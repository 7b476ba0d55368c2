use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::oauth::models::ProviderName;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn authorize_provider(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(provider): Path<String>,
) -> Result<ApiSuccess<AuthorizeProviderResponseData>, ApiError> {
    let provider = ProviderName::new(&provider).map_err(OAuthError::from)?;

    state
        .oauth_service
        .authorization_url(&caller.user_id, &provider)
        .await
        .map_err(ApiError::from)
        .map(|authorization_url| {
            ApiSuccess::new(
                StatusCode::OK,
                "Authorization URL created",
                AuthorizeProviderResponseData { authorization_url },
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeProviderResponseData {
    pub authorization_url: String,
}
