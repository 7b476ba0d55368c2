use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::account::models::UserId;
use crate::domain::oauth::errors::OAuthError;
use crate::domain::oauth::models::OAuthTokenRecord;
use crate::domain::oauth::models::ProviderName;
use crate::domain::oauth::ports::OAuthTokenRepository;

#[derive(Default)]
pub struct MemoryOAuthTokenRepository {
    records: Arc<RwLock<HashMap<(UserId, ProviderName), OAuthTokenRecord>>>,
}

impl MemoryOAuthTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuthTokenRepository for MemoryOAuthTokenRepository {
    async fn find(
        &self,
        user_id: &UserId,
        provider: &ProviderName,
    ) -> Result<Option<OAuthTokenRecord>, OAuthError> {
        Ok(self
            .records
            .read()
            .await
            .get(&(*user_id, provider.clone()))
            .cloned())
    }

    async fn upsert(&self, record: OAuthTokenRecord) -> Result<OAuthTokenRecord, OAuthError> {
        self.records
            .write()
            .await
            .insert((record.user_id, record.provider.clone()), record.clone());
        Ok(record)
    }

    async fn delete(&self, user_id: &UserId, provider: &ProviderName) -> Result<bool, OAuthError> {
        Ok(self
            .records
            .write()
            .await
            .remove(&(*user_id, provider.clone()))
            .is_some())
    }
}
