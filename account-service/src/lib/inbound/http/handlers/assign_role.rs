use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::require_admin;
use super::ApiError;
use super::ApiSuccess;
use super::NoData;
use crate::domain::account::errors::UserIdError;
use crate::domain::account::models::UserId;
use crate::domain::role::errors::RoleIdError;
use crate::domain::role::models::AssignOutcome;
use crate::domain::role::models::RoleId;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

/// Grant a role to a user. Admin only; the target user must exist.
pub async fn assign_role(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<RoleMembershipRequest>,
) -> Result<ApiSuccess<NoData>, ApiError> {
    require_admin(&state, &caller).await?;
    let (user_id, role_id) = body.parse()?;

    state.account_service.get_user(&user_id).await?;

    state
        .role_service
        .assign(&user_id, &role_id)
        .await
        .map_err(ApiError::from)
        .map(|outcome| {
            let message = match outcome {
                AssignOutcome::Assigned => "Role added to user",
                AssignOutcome::AlreadyHeld => "User already has this role",
            };
            ApiSuccess::new(StatusCode::OK, message, NoData {})
        })
}

/// Body shared by the assign and revoke endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMembershipRequest {
    user_id: String,
    role_id: String,
}

#[derive(Debug, Clone, Error)]
pub(crate) enum ParseRoleMembershipRequestError {
    #[error("Invalid user ID: {0}")]
    UserId(#[from] UserIdError),

    #[error("Invalid role id: {0}")]
    RoleId(#[from] RoleIdError),
}

impl RoleMembershipRequest {
    pub(crate) fn parse(self) -> Result<(UserId, RoleId), ParseRoleMembershipRequestError> {
        Ok((UserId::from_string(&self.user_id)?, RoleId::new(self.role_id)?))
    }
}

impl From<ParseRoleMembershipRequestError> for ApiError {
    fn from(err: ParseRoleMembershipRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}
