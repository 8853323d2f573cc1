#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use destiny_exec::{
    Engine, EngineConfig, FnEndpoint, HttpClient, HttpError, HttpLogEvent, HttpLogSink,
    HttpRequestParts, HttpResponseParts, Route,
};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

/// Answers by longest URL prefix and records every request it sees.
#[derive(Default)]
pub struct FakeHttpClient {
    routes: Vec<(String, Reply)>,
    requests: Mutex<Vec<HttpRequestParts>>,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, prefix: &str, reply: Reply) -> Self {
        self.routes.push((prefix.to_string(), reply));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequestParts> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url.to_string()).collect()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn send(
        &self,
        req: HttpRequestParts,
        _max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        let url = req.url.to_string();
        self.requests.lock().unwrap().push(req);
        let reply = self
            .routes
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, reply)| reply.clone());
        let Some(reply) = reply else {
            return Err(HttpError::Network(format!("connection refused: {url}")));
        };
        tokio::time::sleep(reply.delay).await;
        Ok(HttpResponseParts {
            status: reply.status,
            headers: BTreeMap::new(),
            body: reply.body.into_bytes(),
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<HttpLogEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<HttpLogEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.msg).collect()
    }

    pub fn find(&self, msg: &str) -> Option<HttpLogEvent> {
        self.events().into_iter().find(|e| e.msg == msg)
    }
}

#[async_trait]
impl HttpLogSink for RecordingSink {
    async fn emit(&self, event: HttpLogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn engine(http: &Arc<FakeHttpClient>, sink: &Arc<RecordingSink>) -> Engine {
    engine_with(EngineConfig::default(), http, sink)
}

pub fn engine_with(config: EngineConfig, http: &Arc<FakeHttpClient>, sink: &Arc<RecordingSink>) -> Engine {
    Engine::new(config)
        .with_http_client(http.clone())
        .with_http_log(sink.clone())
}

pub fn route(endpoint: FnEndpoint) -> Route {
    Route::new("1.0.0", Arc::new(endpoint))
}
