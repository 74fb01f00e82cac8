use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

use crate::services::{
    auth::{
        account::{Account, StoredAccount},
        session::SessionId,
        token_store::store::{TokenStore, TokenStoreError},
    },
    cache::{CacheClient, ValkeyClient},
};

/// Valkey-backed token store (Redis protocol).
///
/// Accounts are stored as JSON under `<prefix>:<sha256(session id)>` with the session TTL,
/// so raw session ids never appear in the keyspace.
#[derive(Clone)]
pub struct ValkeyTokenStore<C: CacheClient> {
    cache: Arc<C>,
    prefix: String,
    ttl: Duration,
}

impl ValkeyTokenStore<ValkeyClient> {
    pub async fn connect(
        url: &str,
        prefix: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, TokenStoreError> {
        let client = ValkeyClient::new(url).await?;
        Ok(Self::new_with_cache(Arc::new(client), prefix, ttl))
    }
}

impl<C: CacheClient> ValkeyTokenStore<C> {
    pub fn new_with_cache(cache: Arc<C>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            ttl,
        }
    }

    pub fn key(&self, session_id: &SessionId) -> String {
        let digest = Sha256::digest(session_id.as_str().as_bytes());
        format!("{}:{}", self.prefix, URL_SAFE_NO_PAD.encode(digest))
    }
}

#[async_trait]
impl<C: CacheClient> TokenStore for ValkeyTokenStore<C> {
    fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    async fn save(&self, session_id: &SessionId, account: &Account) -> Result<(), TokenStoreError> {
        let value = serde_json::to_string(&StoredAccount::from(account))?;
        self.cache
            .set_with_ttl(&self.key(session_id), &value, self.ttl)
            .await?;
        Ok(())
    }

    async fn lookup(&self, session_id: &SessionId) -> Result<Option<Account>, TokenStoreError> {
        let Some(raw) = self.cache.get_string(&self.key(session_id)).await? else {
            return Ok(None);
        };
        let stored: StoredAccount = serde_json::from_str(&raw)?;
        Ok(Some(stored.into()))
    }

    async fn invalidate(&self, session_id: &SessionId) -> Result<bool, TokenStoreError> {
        let removed = self.cache.del(&self.key(session_id)).await?;
        Ok(removed > 0)
    }
}
