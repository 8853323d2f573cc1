use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A mock (or interceptor) picked for one dependency call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockSelection {
    /// Name in the mock catalog; `None` means the mock is switched off.
    #[serde(default)]
    pub mock: Option<String>,
    /// Milliseconds before delivery.
    #[serde(default)]
    pub latency: u64,
    #[serde(default = "default_status", alias = "status")]
    pub status_code: u16,
}

fn default_status() -> u16 {
    200
}

impl MockSelection {
    pub fn named(mock: impl Into<String>) -> Self {
        Self {
            mock: Some(mock.into()),
            latency: 0,
            status_code: default_status(),
        }
    }

    pub fn with_latency(mut self, latency: u64) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.mock.is_some()
    }
}

/// Fixed mock for one dependency key in a test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCallConfig {
    pub mock: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl TestCallConfig {
    pub fn selection(&self) -> MockSelection {
        MockSelection {
            mock: Some(self.mock.clone()),
            latency: self.latency.unwrap_or(0),
            status_code: self.status.unwrap_or_else(default_status),
        }
    }
}

/// Dependency key to the mock it is pinned to for a test request.
pub type TestConfig = BTreeMap<String, TestCallConfig>;
