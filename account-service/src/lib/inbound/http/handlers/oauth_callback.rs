use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::account::errors::AccountError;
use crate::domain::account::models::UserId;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::oauth::models::ProviderName;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

/// Completes a provider link. Callers may only link their own account.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<OAuthCallbackRequest>,
) -> Result<ApiSuccess<OAuthCallbackResponseData>, ApiError> {
    let user_id = UserId::from_string(&body.user_id).map_err(AccountError::from)?;
    if user_id != caller.user_id {
        return Err(ApiError::Forbidden(
            "Cannot link a provider for another user".to_string(),
        ));
    }
    let provider = ProviderName::new(&body.provider).map_err(OAuthError::from)?;

    state
        .oauth_service
        .handle_callback(&user_id, &provider, &body.code, body.state.as_deref())
        .await
        .map_err(ApiError::from)
        .map(|record| {
            ApiSuccess::new(
                StatusCode::OK,
                "Provider account linked",
                OAuthCallbackResponseData {
                    provider: record.provider.to_string(),
                    expires_at: record.expires_at,
                },
            )
        })
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallbackRequest {
    user_id: String,
    provider: String,
    code: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallbackResponseData {
    pub provider: String,
    pub expires_at: DateTime<Utc>,
}
