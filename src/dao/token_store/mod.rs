/// Redis token store.
#[cfg(feature = "redis-store")]
pub mod redis;

use futures::future::BoxFuture;

use crate::dao::{
    models::{StoredTokens, TokenRecord},
    storage::StorageResult,
};

/// Abstraction over the durable copy of Event Gateway tokens.
pub trait TokenStore: Send + Sync {
    /// Persist both tokens of one grantee, replacing what was there.
    fn save_tokens(&self, record: TokenRecord) -> BoxFuture<'static, StorageResult<()>>;
    /// Every grantee with an access token, a refresh token, or both.
    fn list_tokens(&self) -> BoxFuture<'static, StorageResult<Vec<StoredTokens>>>;
    /// Cheap round trip proving the backend still answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
