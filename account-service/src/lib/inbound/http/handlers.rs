use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::account::errors::AccountError;
use crate::domain::errors::ErrorKind;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::role::errors::RoleError;
use crate::domain::role::models::RoleId;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub mod assign_role;
pub mod authorize_provider;
pub mod confirm_email;
pub mod create_role;
pub mod disconnect_provider;
pub mod enable_two_factor;
pub mod forgot_password;
pub mod list_roles;
pub mod list_user_roles;
pub mod login;
pub mod oauth_callback;
pub mod provider_status;
pub mod register;
pub mod resend_confirmation;
pub mod reset_password;
pub mod revoke_role;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, message, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    BadGateway(String),
}

impl ApiError {
    pub(crate) fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        }
    }

    /// Translate a classified domain failure. Internal details are logged and
    /// replaced by a generic message.
    fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => ApiError::UnprocessableEntity(message),
            ErrorKind::Conflict | ErrorKind::ReauthorizationRequired => ApiError::Conflict(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Expired | ErrorKind::InvalidToken => ApiError::BadRequest(message),
            ErrorKind::InvalidCredentials => ApiError::Unauthorized(message),
            ErrorKind::NotVerified | ErrorKind::Forbidden => ApiError::Forbidden(message),
            ErrorKind::ExternalService => ApiError::BadGateway(message),
            ErrorKind::Internal => {
                tracing::error!(error = %message, "Request failed with internal error");
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::from_kind(ErrorKind::Internal, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<RoleError> for ApiError {
    fn from(err: RoleError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

/// Guard for administrative endpoints. Checked against the role store on
/// every call, never against token claims.
pub(crate) async fn require_admin(
    state: &AppState,
    caller: &AuthenticatedUser,
) -> Result<(), ApiError> {
    state
        .role_service
        .require_role(&caller.user_id, &RoleId::admin())
        .await
        .map_err(ApiError::from)
}

/// Response envelope: `{statusCode, isSuccess, message, ...data}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    is_success: bool,
    message: String,
    #[serde(flatten)]
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            is_success: true,
            message: message.into(),
            data,
        }
    }

    /// Failure envelope carrying extra fields.
    pub fn failure(status_code: StatusCode, message: String, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            is_success: false,
            message,
            data,
        }
    }
}

impl ApiResponseBody<NoData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self::failure(status_code, message, NoData {})
    }
}

/// Empty payload for responses that carry only the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoData {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_is_camel_case_and_flattened() {
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            user_id: String,
        }

        let body = ApiResponseBody::new(
            StatusCode::CREATED,
            "Created",
            Data {
                user_id: "42".to_string(),
            },
        );
        let json = serde_json::to_value(body).unwrap();

        assert_eq!(json["statusCode"], 201);
        assert_eq!(json["isSuccess"], true);
        assert_eq!(json["message"], "Created");
        assert_eq!(json["userId"], "42");
    }

    #[test]
    fn test_error_envelope() {
        let json =
            serde_json::to_value(ApiResponseBody::new_error(StatusCode::CONFLICT, "taken".into()))
                .unwrap();

        assert_eq!(json["isSuccess"], false);
        assert_eq!(json["message"], "taken");
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_error_kinds_map_to_status() {
        let cases = [
            (ApiError::from(AccountError::EmailAlreadyExists), StatusCode::CONFLICT),
            (ApiError::from(AccountError::NotVerified), StatusCode::FORBIDDEN),
            (ApiError::from(AccountError::TokenExpired), StatusCode::BAD_REQUEST),
            (ApiError::from(AccountError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (
                ApiError::from(OAuthError::ReauthorizationRequired("revoked".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(OAuthError::ExternalService("down".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(RoleError::Forbidden("admin".into())),
                StatusCode::FORBIDDEN,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_and_message().0, expected);
        }
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let error = ApiError::from(AccountError::DatabaseError("password=hunter2".into()));
        assert_eq!(
            error,
            ApiError::InternalServerError("Internal server error".to_string())
        );
    }
}
