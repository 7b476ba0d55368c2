use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn enable_two_factor(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<ApiSuccess<TwoFactorResponseData>, ApiError> {
    state
        .account_service
        .enable_two_factor(&caller.user_id)
        .await
        .map_err(ApiError::from)
        .map(|user| {
            ApiSuccess::new(
                StatusCode::OK,
                "Two-factor authentication enabled",
                TwoFactorResponseData {
                    two_factor_enabled: user.two_factor_enabled,
                },
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorResponseData {
    pub two_factor_enabled: bool,
}
