use async_trait::async_trait;

use crate::services::{
    auth::{account::Account, session::SessionId},
    cache::CacheError,
};

/// Account persistence keyed by session correlation id.
///
/// - one account per id; `save` overwrites (last write wins) and is atomic per key
/// - `lookup` returns `Ok(None)` for unknown or evicted ids
/// - `invalidate` returns whether an entry was removed (logout)
#[async_trait]
pub trait TokenStore: Send + Sync {
    // Backend name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn save(&self, session_id: &SessionId, account: &Account) -> Result<(), TokenStoreError>;

    async fn lookup(&self, session_id: &SessionId) -> Result<Option<Account>, TokenStoreError>;

    async fn invalidate(&self, session_id: &SessionId) -> Result<bool, TokenStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("account encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
