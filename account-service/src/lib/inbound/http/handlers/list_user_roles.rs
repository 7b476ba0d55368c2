use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::require_admin;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::account::errors::AccountError;
use crate::domain::account::models::UserId;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

/// Roles held by a user. Visible to the user themselves and to admins.
pub async fn list_user_roles(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> Result<ApiSuccess<UserRolesResponseData>, ApiError> {
    let user_id = UserId::from_string(&user_id).map_err(AccountError::from)?;
    if user_id != caller.user_id {
        require_admin(&state, &caller).await?;
    }

    state
        .role_service
        .roles_for(&user_id)
        .await
        .map_err(ApiError::from)
        .map(|roles| {
            ApiSuccess::new(
                StatusCode::OK,
                "Roles retrieved",
                UserRolesResponseData {
                    user_id: user_id.to_string(),
                    roles: roles.iter().map(ToString::to_string).collect(),
                },
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRolesResponseData {
    pub user_id: String,
    pub roles: Vec<String>,
}
