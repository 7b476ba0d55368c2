use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::account::models::UserId;
use crate::domain::role::errors::RoleError;
use crate::domain::role::models::Role;
use crate::domain::role::models::RoleAssignment;
use crate::domain::role::models::RoleId;
use crate::domain::role::ports::RoleRepository;

#[derive(Default)]
pub struct MemoryRoleRepository {
    roles: Arc<RwLock<HashMap<RoleId, Role>>>,
    assignments: Arc<RwLock<HashSet<(UserId, RoleId)>>>,
}

impl MemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `admin`, `moderator` and `user`.
    pub fn with_default_roles() -> Self {
        let roles = Role::defaults()
            .into_iter()
            .map(|role| (role.id.clone(), role))
            .collect();

        Self {
            roles: Arc::new(RwLock::new(roles)),
            assignments: Arc::default(),
        }
    }
}

#[async_trait]
impl RoleRepository for MemoryRoleRepository {
    async fn create_role(&self, role: Role) -> Result<Role, RoleError> {
        let mut roles = self.roles.write().await;
        if roles.contains_key(&role.id) {
            return Err(RoleError::RoleAlreadyExists(role.id.to_string()));
        }
        roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    async fn find_role(&self, id: &RoleId) -> Result<Option<Role>, RoleError> {
        Ok(self.roles.read().await.get(id).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RoleError> {
        let mut roles: Vec<Role> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(roles)
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> Result<bool, RoleError> {
        Ok(self
            .assignments
            .write()
            .await
            .insert((assignment.user_id, assignment.role_id)))
    }

    async fn delete_assignment(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<bool, RoleError> {
        Ok(self
            .assignments
            .write()
            .await
            .remove(&(*user_id, role_id.clone())))
    }

    async fn assignment_exists(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<bool, RoleError> {
        Ok(self
            .assignments
            .read()
            .await
            .contains(&(*user_id, role_id.clone())))
    }

    async fn roles_for(&self, user_id: &UserId) -> Result<Vec<RoleId>, RoleError> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|(holder, _)| holder == user_id)
            .map(|(_, role_id)| role_id.clone())
            .collect())
    }
}
