use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::account::models::UserId;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::oauth::models::OAuthTokenRecord;
use crate::domain::oauth::models::ProviderName;
use crate::domain::oauth::ports::OAuthTokenRepository;

pub struct PostgresOAuthTokenRepository {
    pool: PgPool,
}

impl PostgresOAuthTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct OAuthTokenRow {
    user_id: Uuid,
    provider: String,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OAuthTokenRow> for OAuthTokenRecord {
    type Error = OAuthError;

    fn try_from(row: OAuthTokenRow) -> Result<Self, Self::Error> {
        Ok(OAuthTokenRecord {
            user_id: UserId(row.user_id),
            provider: ProviderName::new(&row.provider)?,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn database_error(e: sqlx::Error) -> OAuthError {
    OAuthError::DatabaseError(e.to_string())
}

#[async_trait]
impl OAuthTokenRepository for PostgresOAuthTokenRepository {
    async fn find(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<Option<OAuthTokenRecord>, OAuthError> {
        let row = sqlx::query_as::<_, OAuthTokenRow>(
            r#"
            SELECT user_id, provider, access_token, refresh_token, expires_at, created_at, updated_at
            FROM oauth_tokens
            WHERE user_id = $1 AND provider = $2
            "#,
        )
        .bind(user_id.0)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(OAuthTokenRecord::try_from).transpose()
    }

    async fn upsert(&self, record: OAuthTokenRecord) -> Result<OAuthTokenRecord, OAuthError> {
        sqlx::query(
            r#"
            INSERT INTO oauth_tokens (
                user_id, provider, access_token, refresh_token, expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, provider) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.user_id.0)
        .bind(record.provider.as_str())
        .bind(&record.access_token)
        .bind(&record.refresh_token)
        .bind(record.expires_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(record)
    }

    async fn delete(&self, user_id: &UserId, provider: &ProviderName) -> Result<bool, OAuthError> {
        let result = sqlx::query("DELETE FROM oauth_tokens WHERE user_id = $1 AND provider = $2")
            .bind(user_id.0)
            .bind(provider.as_str())
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(result.rows_affected() > 0)
    }
}
