use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::list_roles::RoleData;
use super::require_admin;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::role::errors::RoleError;
use crate::domain::role::models::CreateRoleCommand;
use crate::domain::role::models::RoleId;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn create_role(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<CreateRoleRequest>,
) -> Result<ApiSuccess<RoleData>, ApiError> {
    require_admin(&state, &caller).await?;

    state
        .role_service
        .create_role(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|role| ApiSuccess::new(StatusCode::CREATED, "Role created", (&role).into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateRoleRequest {
    id: String,
    name: String,
}

impl CreateRoleRequest {
    fn try_into_command(self) -> Result<CreateRoleCommand, RoleError> {
        CreateRoleCommand::new(RoleId::new(self.id)?, self.name)
    }
}
