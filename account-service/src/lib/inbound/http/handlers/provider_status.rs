use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::oauth::models::ProviderName;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn provider_status(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(provider): Path<String>,
) -> Result<ApiSuccess<ProviderStatusResponseData>, ApiError> {
    let provider = ProviderName::new(&provider).map_err(OAuthError::from)?;

    let status = state
        .oauth_service
        .status(&caller.user_id, &provider)
        .await?;

    let message = if status.linked {
        "Provider account linked"
    } else {
        "No linked account"
    };

    Ok(ApiSuccess::new(
        StatusCode::OK,
        message,
        ProviderStatusResponseData {
            provider: provider.to_string(),
            linked: status.linked,
            expires_at: status.expires_at,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatusResponseData {
    pub provider: String,
    pub linked: bool,
    pub expires_at: Option<DateTime<Utc>>,
}
