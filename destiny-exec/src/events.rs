use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub const DEPENDPOINT_NOT_OK: &str = "Dependpoint not ok";
pub const DEPENDPOINT_TIMED_OUT: &str = "Dependpoint timed out";
pub const DURATION_EXCEEDED: &str = "Duration exceeded limit";
pub const SERVER_ERROR: &str = "Server error";
pub const SCRIPT_ERROR: &str = "Server Error";
pub const APPLICATION_MSG: &str = "Application Msg";

/// One structured http-log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpLogEvent {
    pub msg: String,
    pub url: String,
    pub api_version: String,
    pub meta: Value,
    /// Header parameters flagged `http_log`, by name.
    #[serde(flatten)]
    pub header_parameters: BTreeMap<String, Value>,
}

#[async_trait]
pub trait HttpLogSink: Send + Sync {
    async fn emit(&self, event: HttpLogEvent);
}

pub struct CompositeHttpLogSink {
    sinks: Vec<Box<dyn HttpLogSink>>,
}

impl Default for CompositeHttpLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeHttpLogSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn HttpLogSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl HttpLogSink for CompositeHttpLogSink {
    async fn emit(&self, event: HttpLogEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// Writes each record as one JSON line on stdout.
pub struct StdoutHttpLogSink;

#[async_trait]
impl HttpLogSink for StdoutHttpLogSink {
    async fn emit(&self, event: HttpLogEvent) {
        println!("{}", serde_json::to_string(&event).unwrap_or_default());
    }
}

/// Forwards records to `tracing` under the `destiny::http_log` target.
pub struct TracingHttpLogSink;

#[async_trait]
impl HttpLogSink for TracingHttpLogSink {
    async fn emit(&self, event: HttpLogEvent) {
        let record = serde_json::to_string(&event).unwrap_or_default();
        tracing::error!(target: "destiny::http_log", url = %event.url, api_version = %event.api_version, "{}: {record}", event.msg);
    }
}

pub struct NoOpHttpLogSink;

#[async_trait]
impl HttpLogSink for NoOpHttpLogSink {
    async fn emit(&self, _event: HttpLogEvent) {}
}
