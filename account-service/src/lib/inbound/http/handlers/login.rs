use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiResponseBody;
use super::ApiSuccess;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::LoginCommand;
use crate::domain::account::models::Session;
use crate::inbound::http::router::AppState;

/// Check credentials and hand out a signed session token.
///
/// Every failure, including a malformed email, carries `isAuthenticated: false`.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiSuccess<LoginResponseData>, LoginFailure> {
    let email = EmailAddress::new(body.email)
        .map_err(|_| LoginFailure(ApiError::Unauthorized("Invalid credentials".to_string())))?;

    let session = state
        .account_service
        .login(LoginCommand {
            email,
            password: body.password,
            remember_me: body.remember_me,
        })
        .await
        .map_err(|e| LoginFailure(ApiError::from(e)))?;

    let roles: Vec<String> = session.roles.iter().map(ToString::to_string).collect();

    let issued = state
        .authenticator
        .issue_session(
            &session.user_id.to_string(),
            session.email.as_str(),
            roles,
            session.remember_me,
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to issue session token");
            LoginFailure(ApiError::InternalServerError(
                "Internal server error".to_string(),
            ))
        })?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        "User logged in",
        LoginResponseData {
            is_authenticated: true,
            token: issued.access_token,
            expires_at: DateTime::<Utc>::from_timestamp(issued.claims.exp, 0),
            user: (&session).into(),
        },
    ))
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    email: String,
    password: String,
    #[serde(default)]
    remember_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    pub is_authenticated: bool,
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: SessionUserData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUserData {
    pub id: String,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<&Session> for SessionUserData {
    fn from(session: &Session) -> Self {
        Self {
            id: session.user_id.to_string(),
            email: session.email.to_string(),
            username: session.username.to_string(),
            roles: session.roles.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Login error response: the usual error envelope plus `isAuthenticated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFailure(pub ApiError);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginFailureData {
    pub is_authenticated: bool,
}

impl IntoResponse for LoginFailure {
    fn into_response(self) -> Response {
        let (status, message) = self.0.status_and_message();
        let body = ApiResponseBody::failure(
            status,
            message,
            LoginFailureData {
                is_authenticated: false,
            },
        );
        (status, Json(body)).into_response()
    }
}
