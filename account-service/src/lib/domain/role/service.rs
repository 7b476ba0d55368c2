use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;

use crate::domain::account::models::UserId;
use crate::domain::role::errors::RoleError;
use crate::domain::role::models::AssignOutcome;
use crate::domain::role::models::CreateRoleCommand;
use crate::domain::role::models::RevokeOutcome;
use crate::domain::role::models::Role;
use crate::domain::role::models::RoleAssignment;
use crate::domain::role::models::RoleId;
use crate::domain::role::ports::RoleRepository;
use crate::domain::role::ports::RoleServicePort;

/// Role assignment and authorization decisions.
pub struct RoleAuthorizer<RR>
where
    RR: RoleRepository,
{
    repository: Arc<RR>,
    clock: Arc<dyn Clock>,
}

impl<RR> RoleAuthorizer<RR>
where
    RR: RoleRepository,
{
    pub fn new(repository: Arc<RR>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }
}

#[async_trait]
impl<RR> RoleServicePort for RoleAuthorizer<RR>
where
    RR: RoleRepository,
{
    async fn assign(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<AssignOutcome, RoleError> {
        if self.repository.find_role(role_id).await?.is_none() {
            return Err(RoleError::RoleNotFound(role_id.to_string()));
        }

        let assignment = RoleAssignment {
            user_id: *user_id,
            role_id: role_id.clone(),
            assigned_at: self.clock.now(),
        };

        let outcome = if self.repository.insert_assignment(assignment).await? {
            tracing::info!(user_id = %user_id, role_id = %role_id, "Role assigned");
            AssignOutcome::Assigned
        } else {
            AssignOutcome::AlreadyHeld
        };

        Ok(outcome)
    }

    async fn revoke(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<RevokeOutcome, RoleError> {
        if self.repository.delete_assignment(user_id, role_id).await? {
            tracing::info!(user_id = %user_id, role_id = %role_id, "Role revoked");
            Ok(RevokeOutcome::Revoked)
        } else {
            Ok(RevokeOutcome::NotHeld)
        }
    }

    async fn has_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<bool, RoleError> {
        self.repository.assignment_exists(user_id, role_id).await
    }

    async fn require_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<(), RoleError> {
        if self.has_role(user_id, role_id).await? {
            Ok(())
        } else {
            tracing::warn!(user_id = %user_id, role_id = %role_id, "Role check failed");
            Err(RoleError::Forbidden(role_id.to_string()))
        }
    }

    async fn roles_for(&self, user_id: &UserId) -> Result<Vec<RoleId>, RoleError> {
        let mut roles = self.repository.roles_for(user_id).await?;
        roles.sort();
        Ok(roles)
    }

    async fn create_role(&self, command: CreateRoleCommand) -> Result<Role, RoleError> {
        let role = Role {
            id: command.id,
            name: command.name,
        };
        let created = self.repository.create_role(role).await?;
        tracing::info!(role_id = %created.id, "Role created");
        Ok(created)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RoleError> {
        self.repository.list_roles().await
    }
}
