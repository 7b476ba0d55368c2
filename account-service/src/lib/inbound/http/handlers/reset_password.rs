use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::NoData;
use crate::domain::account::errors::EmailError;
use crate::domain::account::errors::PasswordPolicyError;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::Password;
use crate::domain::account::models::ResetPasswordCommand;
use crate::inbound::http::router::AppState;

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<ApiSuccess<NoData>, ApiError> {
    state
        .account_service
        .reset_password(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::OK, "Password has been reset", NoData {}))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    email: String,
    reset_code: String,
    new_password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseResetPasswordRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),
}

impl ResetPasswordRequest {
    fn try_into_command(self) -> Result<ResetPasswordCommand, ParseResetPasswordRequestError> {
        Ok(ResetPasswordCommand {
            email: EmailAddress::new(self.email)?,
            reset_code: self.reset_code,
            new_password: Password::new(self.new_password)?,
        })
    }
}

impl From<ParseResetPasswordRequestError> for ApiError {
    fn from(err: ParseResetPasswordRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}
