use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::NoData;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::oauth::models::ProviderName;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

/// Idempotent: unlinking an account that was never linked still succeeds.
pub async fn disconnect_provider(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(provider): Path<String>,
) -> Result<ApiSuccess<NoData>, ApiError> {
    let provider = ProviderName::new(&provider).map_err(OAuthError::from)?;

    state
        .oauth_service
        .disconnect(&caller.user_id, &provider)
        .await
        .map_err(ApiError::from)
        .map(|removed| {
            let message = if removed {
                "Provider account unlinked"
            } else {
                "No linked account"
            };
            ApiSuccess::new(StatusCode::OK, message, NoData {})
        })
}
