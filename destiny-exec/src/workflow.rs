use std::collections::BTreeMap;
use std::time::Duration;

use destiny_core::{CallSpec, ClientError, MockSelection, OutputContract, OutputKind, ParamMap};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ScriptError;

pub type CallId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending,
    Succeeded,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMeta {
    pub started_at: Instant,
    pub ended_at: Option<Instant>,
    pub depend_url: Option<String>,
    pub timed_out: bool,
}

impl CallMeta {
    fn start() -> Self {
        Self {
            started_at: Instant::now(),
            ended_at: None,
            depend_url: None,
            timed_out: false,
        }
    }

    /// First write wins.
    fn finish(&mut self, depend_url: &str, timed_out: bool) {
        if self.ended_at.is_some() {
            return;
        }
        self.ended_at = Some(Instant::now());
        self.depend_url = Some(depend_url.to_string());
        self.timed_out = timed_out;
    }

    pub fn duration(&self) -> Option<Duration> {
        self.ended_at.map(|end| end.duration_since(self.started_at))
    }
}

/// Mock and interceptor picked for a call, when any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    pub mock: Option<MockSelection>,
    pub interceptor: Option<MockSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub state: CallState,
    pub meta: CallMeta,
    /// Dispatch generation; only the settlement carrying it is processed.
    pub ticket: u64,
    pub substitution: Option<Substitution>,
}

/// Headers produced for the request: `client` is returned, `internal` only forwarded and logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub client: BTreeMap<String, String>,
    pub internal: BTreeMap<String, String>,
}

impl ResponseHeaders {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.client
            .get(name)
            .or_else(|| self.internal.get(name))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Queued {
    Call {
        id: CallId,
        ticket: u64,
        target: String,
        spec: CallSpec,
    },
    CacheGet {
        key: String,
    },
    CachePut {
        key: String,
        value: String,
        ttl_seconds: u64,
    },
}

/// Per-request state shared by every handler of one invocation.
#[derive(Debug)]
pub struct Workflow {
    contract: OutputContract,
    params: ParamMap,
    request_headers: BTreeMap<String, String>,
    id_path: Vec<String>,
    id_map: BTreeMap<String, String>,
    output: Value,
    error: Option<ClientError>,
    rendered: bool,
    finalizing: bool,
    headers: ResponseHeaders,
    calls: BTreeMap<CallId, CallRecord>,
    cache_calls: BTreeMap<String, bool>,
    queue: Vec<Queued>,
    next_ticket: u64,
    /// Scratch space for endpoint code.
    pub data: serde_json::Map<String, Value>,
}

impl Workflow {
    pub(crate) fn new(
        contract: OutputContract,
        request_headers: &BTreeMap<String, String>,
        id_path: Vec<String>,
        id_map: BTreeMap<String, String>,
    ) -> Self {
        let output = match contract.kind {
            OutputKind::Array => Value::Array(Vec::new()),
            _ => Value::Object(serde_json::Map::new()),
        };
        Self {
            contract,
            params: ParamMap::new(),
            request_headers: request_headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect(),
            id_path,
            id_map,
            output,
            error: None,
            rendered: false,
            finalizing: false,
            headers: ResponseHeaders::default(),
            calls: BTreeMap::new(),
            cache_calls: BTreeMap::new(),
            queue: Vec::new(),
            next_ticket: 0,
            data: serde_json::Map::new(),
        }
    }

    /// Issue a dependency call identified by its target.
    pub fn call(&mut self, target: impl Into<String>, spec: CallSpec) -> Result<(), ScriptError> {
        let target = target.into();
        self.call_as(target.clone(), target, spec)
    }

    /// Issue a dependency call under an explicit id.
    ///
    /// Re-issuing a pending or settled id starts a new dispatch; settlements of
    /// the earlier one are ignored.
    pub fn call_as(
        &mut self,
        id: impl Into<CallId>,
        target: impl Into<String>,
        spec: CallSpec,
    ) -> Result<(), ScriptError> {
        let target = target.into();
        if self.finalizing {
            tracing::warn!(target: "destiny", "call not allowed after finalizing: {target}");
            return self.reject(ClientError::server("call not allowed after finalizing"));
        }
        let id = id.into();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.calls.insert(
            id.clone(),
            CallRecord {
                state: CallState::Pending,
                meta: CallMeta::start(),
                ticket,
                substitution: None,
            },
        );
        self.queue.push(Queued::Call {
            id,
            ticket,
            target,
            spec,
        });
        Ok(())
    }

    /// Set a field of an object output.
    pub fn output(&mut self, field: &str, value: impl Into<Value>) -> Result<(), ScriptError> {
        if self.contract.kind == OutputKind::Array {
            return self.reject(ClientError::server("output must be an array"));
        }
        if !self.contract.declares(field) {
            return self.reject(ClientError::server(format!("{field} not allowed in output")));
        }
        if let Value::Object(map) = &mut self.output {
            if map.get(field).is_some_and(|v| !v.is_null()) {
                tracing::warn!(target: "destiny", "{field} already written");
            }
            map.insert(field.to_string(), value.into());
        }
        Ok(())
    }

    /// Replace the whole output of an array endpoint.
    pub fn output_array(&mut self, value: Value) -> Result<(), ScriptError> {
        if self.contract.kind != OutputKind::Array || !value.is_array() {
            return self.reject(ClientError::server("output must be an array"));
        }
        if self.output.as_array().is_some_and(|a| !a.is_empty()) {
            tracing::warn!(target: "destiny", "output already written");
        }
        self.output = value;
        Ok(())
    }

    pub fn output_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.client.insert(name.into(), value.into());
    }

    /// Value of a generated header parameter, client set first.
    pub fn http_header_parameter(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Record a terminal error; the response renders once the current handler returns.
    pub fn error(&mut self, error: ClientError) {
        self.error = Some(error);
    }

    /// Record `error` and return the marker a handler can propagate with `?`.
    pub fn reject(&mut self, error: ClientError) -> Result<(), ScriptError> {
        self.error(error);
        Err(ScriptError::Rejected)
    }

    /// Read `key` from the client cache; the outcome goes to the
    /// `cache_get_results` or `cache_get_exception` handler for `key`.
    pub fn cache_get(&mut self, key: impl Into<String>) -> Result<(), ScriptError> {
        let key = key.into();
        if self.finalizing {
            tracing::warn!(target: "destiny", "cache call not allowed after finalizing: {key}");
            return self.reject(ClientError::server("cache call not allowed after finalizing"));
        }
        self.cache_calls.insert(key.clone(), true);
        self.queue.push(Queued::CacheGet { key });
        Ok(())
    }

    /// Write `key` to the client cache; `ttl_seconds` of zero keeps it without expiry.
    pub fn cache_put(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl_seconds: u64,
    ) -> Result<(), ScriptError> {
        let key = key.into();
        if self.finalizing {
            tracing::warn!(target: "destiny", "cache call not allowed after finalizing: {key}");
            return self.reject(ClientError::server("cache call not allowed after finalizing"));
        }
        self.queue.push(Queued::CachePut {
            key,
            value: value.into(),
            ttl_seconds,
        });
        Ok(())
    }

    pub fn id_path(&self) -> &[String] {
        &self.id_path
    }

    pub fn id_path_at(&self, index: usize) -> Option<&str> {
        self.id_path.get(index).map(String::as_str)
    }

    pub fn id_map(&self, name: &str) -> Option<&str> {
        self.id_map.get(name).map(String::as_str)
    }

    /// Cast request parameters, required first then optional.
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Inbound request header, case-insensitive.
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_value(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub fn has_rendered(&self) -> bool {
        self.rendered
    }

    pub fn is_finalizing(&self) -> bool {
        self.finalizing
    }

    pub fn output_value(&self) -> &Value {
        &self.output
    }

    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    pub fn calls(&self) -> &BTreeMap<CallId, CallRecord> {
        &self.calls
    }

    pub fn call_record(&self, id: &str) -> Option<&CallRecord> {
        self.calls.get(id)
    }

    /// Whether any dependency or cache call is still outstanding.
    pub fn has_pending(&self) -> bool {
        self.calls.values().any(|c| c.state == CallState::Pending)
            || self.cache_calls.values().any(|in_progress| *in_progress)
    }

    pub(crate) fn contract(&self) -> &OutputContract {
        &self.contract
    }

    pub(crate) fn set_params(&mut self, params: ParamMap) {
        self.params = params;
    }

    pub(crate) fn headers_mut(&mut self) -> &mut ResponseHeaders {
        &mut self.headers
    }

    pub(crate) fn take_queue(&mut self) -> Vec<Queued> {
        std::mem::take(&mut self.queue)
    }

    pub(crate) fn is_current(&self, id: &str, ticket: u64) -> bool {
        self.calls
            .get(id)
            .is_some_and(|c| c.ticket == ticket && c.state == CallState::Pending)
    }

    /// Close the record for `id`; callers check [`Workflow::is_current`] first.
    pub(crate) fn settle(&mut self, id: &str, state: CallState, depend_url: &str) {
        if let Some(record) = self.calls.get_mut(id) {
            record.meta.finish(depend_url, state == CallState::TimedOut);
            record.state = state;
        }
    }

    pub(crate) fn set_substitution(&mut self, id: &str, substitution: Substitution) {
        if let Some(record) = self.calls.get_mut(id) {
            record.substitution = Some(substitution);
        }
    }

    /// Returns false when `key` was not awaiting a result.
    pub(crate) fn finish_cache_call(&mut self, key: &str) -> bool {
        match self.cache_calls.get_mut(key) {
            Some(in_progress) if *in_progress => {
                *in_progress = false;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_finalizing(&mut self) {
        self.finalizing = true;
    }

    pub(crate) fn mark_rendered(&mut self) {
        self.finalizing = true;
        self.rendered = true;
    }

    /// Apply a cached response: stored headers never overwrite generated ones.
    pub(crate) fn restore(&mut self, headers: BTreeMap<String, String>, output: Value) {
        for (k, v) in headers {
            self.headers.client.entry(k).or_insert(v);
        }
        self.output = output;
    }
}
