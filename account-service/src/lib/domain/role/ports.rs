use async_trait::async_trait;

use crate::domain::account::models::UserId;
use crate::domain::role::errors::RoleError;
use crate::domain::role::models::AssignOutcome;
use crate::domain::role::models::CreateRoleCommand;
use crate::domain::role::models::RevokeOutcome;
use crate::domain::role::models::Role;
use crate::domain::role::models::RoleAssignment;
use crate::domain::role::models::RoleId;

/// Port for role administration and authorization checks.
#[async_trait]
pub trait RoleServicePort: Send + Sync + 'static {
    /// Grant `role_id` to `user_id`. Granting a held role is a no-op.
    ///
    /// # Returns
    /// `Assigned` or `AlreadyHeld`
    ///
    /// # Errors
    /// * `RoleNotFound` - Role does not exist
    /// * `DatabaseError` - Database operation failed
    async fn assign(&self, user_id: &UserId, role_id: &RoleId)
        -> Result<AssignOutcome, RoleError>;

    /// Remove `role_id` from `user_id`. Removing an absent role is a no-op.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn revoke(&self, user_id: &UserId, role_id: &RoleId)
        -> Result<RevokeOutcome, RoleError>;

    /// Whether `user_id` currently holds `role_id`.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn has_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<bool, RoleError>;

    /// Guard: fail unless `user_id` holds `role_id`.
    ///
    /// # Errors
    /// * `Forbidden` - Role not held
    /// * `DatabaseError` - Database operation failed
    async fn require_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<(), RoleError>;

    /// Roles held by `user_id`, sorted by id.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn roles_for(&self, user_id: &UserId) -> Result<Vec<RoleId>, RoleError>;

    /// Define a new role.
    ///
    /// # Errors
    /// * `RoleAlreadyExists` - Id is taken
    /// * `DatabaseError` - Database operation failed
    async fn create_role(&self, command: CreateRoleCommand) -> Result<Role, RoleError>;

    /// All defined roles.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn list_roles(&self) -> Result<Vec<Role>, RoleError>;
}

/// Persistence operations for roles and memberships.
#[async_trait]
pub trait RoleRepository: Send + Sync + 'static {
    /// # Errors
    /// * `RoleAlreadyExists` - Id is taken
    async fn create_role(&self, role: Role) -> Result<Role, RoleError>;

    async fn find_role(&self, id: &RoleId) -> Result<Option<Role>, RoleError>;

    async fn list_roles(&self) -> Result<Vec<Role>, RoleError>;

    /// Insert the assignment unless the pair already exists.
    ///
    /// # Returns
    /// True when a row was inserted
    async fn insert_assignment(&self, assignment: RoleAssignment) -> Result<bool, RoleError>;

    /// # Returns
    /// True when a row was removed
    async fn delete_assignment(&self, user_id: &UserId, role_id: &RoleId)
        -> Result<bool, RoleError>;

    async fn assignment_exists(&self, user_id: &UserId, role_id: &RoleId)
        -> Result<bool, RoleError>;

    async fn roles_for(&self, user_id: &UserId) -> Result<Vec<RoleId>, RoleError>;
}
