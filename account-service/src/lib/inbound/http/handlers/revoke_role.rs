use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;

use super::assign_role::RoleMembershipRequest;
use super::require_admin;
use super::ApiError;
use super::ApiSuccess;
use super::NoData;
use crate::domain::role::models::RevokeOutcome;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn revoke_role(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<RoleMembershipRequest>,
) -> Result<ApiSuccess<NoData>, ApiError> {
    require_admin(&state, &caller).await?;
    let (user_id, role_id) = body.parse()?;

    state
        .role_service
        .revoke(&user_id, &role_id)
        .await
        .map_err(ApiError::from)
        .map(|outcome| {
            let message = match outcome {
                RevokeOutcome::Revoked => "Role removed",
                RevokeOutcome::NotHeld => "User does not have this role",
            };
            ApiSuccess::new(StatusCode::OK, message, NoData {})
        })
}
