use async_trait::async_trait;
use auth::IssuedToken;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::account::errors::AccountError;
use crate::domain::account::models::BirthYear;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::User;
use crate::domain::account::models::UserId;
use crate::domain::account::models::Username;
use crate::domain::account::ports::UserRepository;

const USER_COLUMNS: &str = r#"
    id, email, username, password_hash,
    verification_token, verification_expires_at,
    password_reset_token, reset_expires_at,
    verified_at, birth_year, two_factor_enabled, created_at, version
"#;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    verification_token: Option<String>,
    verification_expires_at: Option<DateTime<Utc>>,
    password_reset_token: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    birth_year: i32,
    two_factor_enabled: bool,
    created_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<UserRow> for User {
    type Error = AccountError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(row.id),
            email: EmailAddress::new(row.email)?,
            username: Username::new(row.username)?,
            password_hash: row.password_hash,
            verification_token: pair(row.verification_token, row.verification_expires_at),
            password_reset_token: pair(row.password_reset_token, row.reset_expires_at),
            verified_at: row.verified_at,
            birth_year: BirthYear::new(row.birth_year)?,
            two_factor_enabled: row.two_factor_enabled,
            created_at: row.created_at,
            version: row.version,
        })
    }
}

/// A token without its expiry (or the reverse) is treated as no token.
fn pair(value: Option<String>, expires_at: Option<DateTime<Utc>>) -> Option<IssuedToken> {
    match (value, expires_at) {
        (Some(value), Some(expires_at)) => Some(IssuedToken::new(value, expires_at)),
        _ => None,
    }
}

fn split(token: &Option<IssuedToken>) -> (Option<&str>, Option<DateTime<Utc>>) {
    match token {
        Some(token) => (Some(token.value.as_str()), Some(token.expires_at)),
        None => (None, None),
    }
}

fn database_error(e: sqlx::Error) -> AccountError {
    AccountError::DatabaseError(e.to_string())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, AccountError> {
        let (verification_token, verification_expires_at) = split(&user.verification_token);
        let (reset_token, reset_expires_at) = split(&user.password_reset_token);

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, username, password_hash,
                verification_token, verification_expires_at,
                password_reset_token, reset_expires_at,
                verified_at, birth_year, two_factor_enabled, created_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(user.username.as_str())
        .bind(&user.password_hash)
        .bind(verification_token)
        .bind(verification_expires_at)
        .bind(reset_token)
        .bind(reset_expires_at)
        .bind(user.verified_at)
        .bind(user.birth_year.value())
        .bind(user.two_factor_enabled)
        .bind(user.created_at)
        .bind(user.version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return AccountError::EmailAlreadyExists;
                }
            }
            database_error(e)
        })?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AccountError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AccountError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(User::try_from).transpose()
    }

    async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AccountError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }

    async fn save(&self, mut user: User) -> Result<User, AccountError> {
        let (verification_token, verification_expires_at) = split(&user.verification_token);
        let (reset_token, reset_expires_at) = split(&user.password_reset_token);

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                verification_token = $3,
                verification_expires_at = $4,
                password_reset_token = $5,
                reset_expires_at = $6,
                verified_at = $7,
                two_factor_enabled = $8,
                version = version + 1
            WHERE id = $1 AND version = $9
            "#,
        )
        .bind(user.id.0)
        .bind(&user.password_hash)
        .bind(verification_token)
        .bind(verification_expires_at)
        .bind(reset_token)
        .bind(reset_expires_at)
        .bind(user.verified_at)
        .bind(user.two_factor_enabled)
        .bind(user.version)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            let exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                    .bind(user.id.0)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(database_error)?;

            return Err(if exists {
                AccountError::StaleRecord(user.id.to_string())
            } else {
                AccountError::NotFound(user.id.to_string())
            });
        }

        user.version += 1;
        Ok(user)
    }
}
