use std::time::Duration;

use destiny_core::HeaderParameter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app_log::AppLogConfig;

pub const DEFAULT_DURATION_WARNING_LIMIT_MS: u64 = 5_000;
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Engine-wide settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Generated per-request headers, in order.
    pub header_parameters: Vec<HeaderParameter>,

    /// Exposed to endpoint, mock and interceptor code as `config()`.
    pub api_context_config: Value,

    /// Requests slower than this emit a "Duration exceeded limit" http-log event.
    pub duration_warning_limit_ms: u64,

    /// Dependency responses larger than this fail as transport errors.
    pub max_response_bytes: usize,

    pub user_agent: String,

    /// Levels and http-log forwarding for the `log()` capability.
    pub app_log: AppLogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            header_parameters: Vec::new(),
            api_context_config: Value::Object(serde_json::Map::new()),
            duration_warning_limit_ms: DEFAULT_DURATION_WARNING_LIMIT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: concat!("destiny/", env!("CARGO_PKG_VERSION")).to_string(),
            app_log: AppLogConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn duration_warning_limit(&self) -> Duration {
        Duration::from_millis(self.duration_warning_limit_ms)
    }

    pub fn with_header_parameter(mut self, param: HeaderParameter) -> Self {
        self.header_parameters.push(param);
        self
    }

    pub fn with_api_context_config(mut self, config: Value) -> Self {
        self.api_context_config = config;
        self
    }

    pub fn with_app_log(mut self, app_log: AppLogConfig) -> Self {
        self.app_log = app_log;
        self
    }
}
