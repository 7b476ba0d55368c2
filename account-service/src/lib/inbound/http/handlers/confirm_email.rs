use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::NoData;
use crate::domain::account::errors::AccountError;
use crate::domain::account::models::UserId;
use crate::inbound::http::router::AppState;

pub async fn confirm_email(
    State(state): State<AppState>,
    Json(body): Json<ConfirmEmailRequest>,
) -> Result<ApiSuccess<NoData>, ApiError> {
    let user_id = UserId::from_string(&body.user_id).map_err(AccountError::from)?;

    state
        .account_service
        .confirm_email(&user_id, &body.token)
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, "Email confirmed", NoData {}))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailRequest {
    #[serde(alias = "id")]
    user_id: String,
    token: String,
}
