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

pub async fn resend_confirmation(
    State(state): State<AppState>,
    Json(body): Json<ResendConfirmationRequest>,
) -> Result<ApiSuccess<NoData>, ApiError> {
    let email = EmailAddress::new(body.email).map_err(AccountError::from)?;

    state
        .account_service
        .resend_confirmation(&email)
        .await
        .map_err(ApiError::from)
        .map(|_| {
            ApiSuccess::new(
                StatusCode::OK,
                "If the account exists and is unverified, a confirmation email has been sent",
                NoData {},
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResendConfirmationRequest {
    email: String,
}
