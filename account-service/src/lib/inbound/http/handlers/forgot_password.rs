use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::NoData;
use crate::domain::account::errors::AccountError;
use crate::domain::account::models::EmailAddress;
use crate::inbound::http::router::AppState;

/// Same response whether or not the email is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<ApiSuccess<NoData>, ApiError> {
    let email = EmailAddress::new(body.email).map_err(AccountError::from)?;

    state
        .account_service
        .request_password_reset(&email)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::OK,
                "If the email is registered, a password reset code has been sent",
                NoData {},
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForgotPasswordRequest {
    email: String,
}
