use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::role::models::Role;
use crate::inbound::http::router::AppState;

pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<ApiSuccess<ListRolesResponseData>, ApiError> {
    state
        .role_service
        .list_roles()
        .await
        .map_err(ApiError::from)
        .map(|roles| {
            ApiSuccess::new(
                StatusCode::OK,
                "Roles retrieved",
                ListRolesResponseData {
                    roles: roles.iter().map(RoleData::from).collect(),
                },
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRolesResponseData {
    pub roles: Vec<RoleData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleData {
    pub id: String,
    pub name: String,
}

impl From<&Role> for RoleData {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.to_string(),
            name: role.name.clone(),
        }
    }
}
