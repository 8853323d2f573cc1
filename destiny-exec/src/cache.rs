use std::collections::BTreeMap;
use std::time::Duration;

use destiny_core::ParamMap;
use destiny_store::CacheStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::encode_params;

pub const CLIENT_CACHE_PREFIX: &str = "_client:";

/// A rendered response as kept in the cache store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub output: Value,
}

/// `<path>?<params>`, params in declaration order.
pub fn response_cache_key(path: &str, params: &ParamMap) -> String {
    format!("{path}?{}", encode_params(params))
}

pub fn client_cache_key(key: &str) -> String {
    format!("{CLIENT_CACHE_PREFIX}{key}")
}

/// Cached response for `key`; store faults and undecodable entries count as a miss.
pub(crate) async fn lookup(store: &dyn CacheStore, key: &str) -> Option<CachedResponse> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(target: "destiny", "response cache read failed for {key}: {e}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(cached) => Some(cached),
        Err(e) => {
            tracing::warn!(target: "destiny", "ignoring undecodable cache entry {key}: {e}");
            None
        }
    }
}

/// Write under `key`; zero seconds stores without expiry.
pub(crate) async fn write(store: &dyn CacheStore, key: &str, value: &str, seconds: u64) {
    let result = if seconds > 0 {
        store
            .set_with_expiry(key, value, Duration::from_secs(seconds))
            .await
    } else {
        store.set(key, value).await
    };
    if let Err(e) = result {
        tracing::warn!(target: "destiny", "cache write failed for {key}: {e}");
    }
}

pub(crate) async fn store_response(store: &dyn CacheStore, key: &str, response: &CachedResponse, seconds: u64) {
    match serde_json::to_string(response) {
        Ok(value) => write(store, key, &value, seconds).await,
        Err(e) => tracing::warn!(target: "destiny", "failed to encode response for cache: {e}"),
    }
}
