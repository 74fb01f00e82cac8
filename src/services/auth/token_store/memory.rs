use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use tokio::{sync::RwLock, time::Instant};

use crate::services::auth::{
    account::Account,
    session::SessionId,
    token_store::store::{TokenStore, TokenStoreError},
};

struct Entry {
    account: Account,
    expires_at: Instant,
}

/// Process-local token store. Used when no `TOKEN_STORE_URL` is configured.
///
/// Entries carry the session TTL like the Valkey backend:
/// - an expired entry is dropped when it is looked up
/// - every `save` prunes whatever has expired, so abandoned sessions do not pile up
pub struct InMemoryTokenStore {
    ttl: Duration,
    accounts: RwLock<HashMap<SessionId, Entry>>,
}

impl std::fmt::Debug for InMemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTokenStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl InMemoryTokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    // Entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, session_id: &SessionId, account: &Account) -> Result<(), TokenStoreError> {
        let now = Instant::now();
        let mut accounts = self.accounts.write().await;

        let before = accounts.len();
        accounts.retain(|_, entry| entry.expires_at > now);
        let pruned = before - accounts.len();
        if pruned > 0 {
            tracing::debug!(pruned, "expired session entries evicted");
        }

        accounts.insert(
            session_id.clone(),
            Entry {
                account: account.clone(),
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    async fn lookup(&self, session_id: &SessionId) -> Result<Option<Account>, TokenStoreError> {
        let now = Instant::now();
        {
            let accounts = self.accounts.read().await;
            match accounts.get(session_id) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.account.clone())),
                Some(_) => {}
            }
        }

        // expired: evict unless a concurrent save already replaced it
        let mut accounts = self.accounts.write().await;
        if let Some(entry) = accounts.get(session_id) {
            if entry.expires_at > now {
                return Ok(Some(entry.account.clone()));
            }
            accounts.remove(session_id);
        }
        Ok(None)
    }

    async fn invalidate(&self, session_id: &SessionId) -> Result<bool, TokenStoreError> {
        Ok(self.accounts.write().await.remove(session_id).is_some())
    }
}
