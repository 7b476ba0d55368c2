use async_trait::async_trait;
use sqlx::FromRow;
use sqlx::PgPool;

use crate::domain::account::models::UserId;
use crate::domain::role::errors::RoleError;
use crate::domain::role::models::Role;
use crate::domain::role::models::RoleAssignment;
use crate::domain::role::models::RoleId;
use crate::domain::role::ports::RoleRepository;

pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: String,
    name: String,
}

impl TryFrom<RoleRow> for Role {
    type Error = RoleError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Role {
            id: RoleId::new(row.id)?,
            name: row.name,
        })
    }
}

fn database_error(e: sqlx::Error) -> RoleError {
    RoleError::DatabaseError(e.to_string())
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn create_role(&self, role: Role) -> Result<Role, RoleError> {
        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2)")
            .bind(role.id.as_str())
            .bind(&role.name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return RoleError::RoleAlreadyExists(role.id.to_string());
                    }
                }
                database_error(e)
            })?;

        Ok(role)
    }

    async fn find_role(&self, id: &RoleId) -> Result<Option<Role>, RoleError> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        row.map(Role::try_from).transpose()
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RoleError> {
        let rows = sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> Result<bool, RoleError> {
        let result = sqlx::query(
            r#"
            INSERT INTO role_assignments (user_id, role_id, assigned_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(assignment.user_id.0)
        .bind(assignment.role_id.as_str())
        .bind(assignment.assigned_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_assignment(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<bool, RoleError> {
        let result =
            sqlx::query("DELETE FROM role_assignments WHERE user_id = $1 AND role_id = $2")
                .bind(user_id.0)
                .bind(role_id.as_str())
                .execute(&self.pool)
                .await
                .map_err(database_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn assignment_exists(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<bool, RoleError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM role_assignments WHERE user_id = $1 AND role_id = $2)",
        )
        .bind(user_id.0)
        .bind(role_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)
    }

    async fn roles_for(&self, user_id: &UserId) -> Result<Vec<RoleId>, RoleError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT role_id FROM role_assignments WHERE user_id = $1 ORDER BY role_id",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        ids.into_iter()
            .map(|id| RoleId::new(id).map_err(RoleError::from))
            .collect()
    }
}
