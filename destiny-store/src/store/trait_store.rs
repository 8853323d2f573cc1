use std::time::Duration;

use async_trait::async_trait;

/// External key-value cache used for rendered responses and client cache calls.
///
/// Values are opaque text; callers serialize before writing.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store without expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache store error: {0}")]
    Other(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Other(e.to_string())
    }
}
