use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::account::errors::AccountError;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::models::User;
use crate::domain::account::models::UserId;
use crate::domain::account::ports::UserRepository;

/// User store keyed by id. Email lookups scan, which is fine at the sizes
/// this backend is meant for.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, AccountError> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(AccountError::EmailAlreadyExists);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AccountError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AccountError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| &user.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AccountError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|user| &user.email == email))
    }

    async fn save(&self, mut user: User) -> Result<User, AccountError> {
        let mut users = self.users.write().await;
        let stored = users
            .get(&user.id)
            .ok_or_else(|| AccountError::NotFound(user.id.to_string()))?;

        if stored.version != user.version {
            return Err(AccountError::StaleRecord(user.id.to_string()));
        }

        user.version += 1;
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::account::models::BirthYear;
    use crate::domain::account::models::Username;

    fn user(email: &str) -> User {
        User {
            id: UserId::new(),
            email: EmailAddress::new(email.to_string()).unwrap(),
            username: Username::new("alice".to_string()).unwrap(),
            password_hash: "hash".to_string(),
            verification_token: None,
            password_reset_token: None,
            verified_at: None,
            birth_year: BirthYear::new(1990).unwrap(),
            two_factor_enabled: false,
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let repository = MemoryUserRepository::new();
        repository.create(user("alice@example.com")).await.unwrap();

        let result = repository.create(user("ALICE@example.com")).await;

        assert!(matches!(result, Err(AccountError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_save_is_compare_and_set() {
        let repository = MemoryUserRepository::new();
        let created = repository.create(user("alice@example.com")).await.unwrap();

        let first = repository.save(created.clone()).await.unwrap();
        assert_eq!(first.version, 1);

        let stale = repository.save(created).await;
        assert!(matches!(stale, Err(AccountError::StaleRecord(_))));
    }

    #[tokio::test]
    async fn test_save_unknown_user() {
        let repository = MemoryUserRepository::new();
        let result = repository.save(user("ghost@example.com")).await;
        assert!(matches!(result, Err(AccountError::NotFound(_))));
    }
}
