use std::collections::BTreeMap;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::common::ParamMap;

/// How a POST body is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BodyEncoding {
    #[default]
    Form,
    Json,
}

impl BodyEncoding {
    pub fn content_type(&self) -> &'static str {
        match self {
            BodyEncoding::Form => "application/x-www-form-urlencoded",
            BodyEncoding::Json => "application/json",
        }
    }
}

impl From<String> for BodyEncoding {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("application/json") || s.eq_ignore_ascii_case("json") {
            BodyEncoding::Json
        } else {
            BodyEncoding::Form
        }
    }
}

impl From<BodyEncoding> for String {
    fn from(e: BodyEncoding) -> Self {
        e.content_type().to_string()
    }
}

/// Options for one dependency call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: ParamMap,

    /// Values for the `$0`, `$1`, ... placeholders of the target URL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rest_ids: Vec<String>,

    /// Header overrides; `None` removes a forwarded header.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Option<String>>,

    #[serde(default)]
    pub body_encoding: BodyEncoding,

    /// Milliseconds; zero disables the deadline.
    #[serde(default)]
    pub timeout: u64,

    #[serde(default)]
    pub allow_error: bool,

    #[serde(default)]
    pub allow_timeout: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expects_json: Option<bool>,
}

impl CallSpec {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self {
            method: Some("POST".to_string()),
            ..Self::default()
        }
    }

    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }

    pub fn is_post(&self) -> bool {
        self.method().eq_ignore_ascii_case("post")
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }

    pub fn expects_json(&self) -> bool {
        self.expects_json.unwrap_or(true)
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn rest_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rest_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.headers.insert(name.into(), value);
        self
    }

    pub fn json_body(mut self) -> Self {
        self.body_encoding = BodyEncoding::Json;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = ms;
        self
    }

    pub fn allow_error(mut self) -> Self {
        self.allow_error = true;
        self
    }

    pub fn allow_timeout(mut self) -> Self {
        self.allow_timeout = true;
        self
    }

    pub fn raw_body(mut self) -> Self {
        self.expects_json = Some(false);
        self
    }
}
