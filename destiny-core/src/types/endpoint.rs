use serde::{Deserialize, Serialize};

/// Per-endpoint settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Seconds; `0` caches without expiry, negative or absent disables the response cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_response_duration: Option<i64>,

    /// Middleware names, run in order before the request handler.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
}

impl EndpointConfig {
    /// Cache duration when the response cache applies to this endpoint.
    pub fn response_cache_duration(&self) -> Option<i64> {
        self.cache_response_duration.filter(|d| *d >= 0)
    }
}
