use std::collections::BTreeMap;
use std::sync::Arc;

use destiny_core::{EndpointConfig, EndpointContract, ParamMap};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::{ScriptError, ScriptSource};
use crate::mock::SubstitutionMode;

/// A unit of endpoint code: its contract, settings and handler registration.
pub trait Endpoint: Send + Sync {
    /// File name used in diagnostics.
    fn name(&self) -> &str;

    fn contract(&self) -> &EndpointContract;

    fn config(&self) -> &EndpointConfig;

    /// Bind handlers; must bind a request handler.
    fn register(&self, ctx: &mut ExecutionContext) -> Result<(), ScriptError>;

    fn source(&self) -> Option<&ScriptSource> {
        None
    }
}

type RegisterFn = dyn Fn(&mut ExecutionContext) -> Result<(), ScriptError> + Send + Sync;

/// Endpoint whose registration is a closure.
pub struct FnEndpoint {
    name: String,
    contract: EndpointContract,
    config: EndpointConfig,
    source: Option<ScriptSource>,
    register: Box<RegisterFn>,
}

impl FnEndpoint {
    pub fn new<F>(name: impl Into<String>, contract: EndpointContract, register: F) -> Self
    where
        F: Fn(&mut ExecutionContext) -> Result<(), ScriptError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            contract,
            config: EndpointConfig::default(),
            source: None,
            register: Box::new(register),
        }
    }

    pub fn with_config(mut self, config: EndpointConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_source(mut self, source: ScriptSource) -> Self {
        self.source = Some(source);
        self
    }
}

impl Endpoint for FnEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> &EndpointContract {
        &self.contract
    }

    fn config(&self) -> &EndpointConfig {
        &self.config
    }

    fn register(&self, ctx: &mut ExecutionContext) -> Result<(), ScriptError> {
        (self.register)(ctx)
    }

    fn source(&self) -> Option<&ScriptSource> {
        self.source.as_ref()
    }
}

/// The request as handed over by the router.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundRequest {
    pub method: String,
    /// Path including RESTful ids, e.g. `/api/v1.0.0/race/raceevent/7`.
    pub path: String,
    /// Raw parameters before casting.
    pub params: ParamMap,
    pub headers: BTreeMap<String, String>,
    pub remote_ip: Option<String>,
    pub id_path: Vec<String>,
    pub id_map: BTreeMap<String, String>,
}

impl InboundRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn remote_ip(mut self, ip: impl Into<String>) -> Self {
        self.remote_ip = Some(ip.into());
        self
    }

    pub fn id_path<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_path = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn id_map_entry(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.id_map.insert(name.into(), value.into());
        self
    }

    /// Header value, case-insensitive.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Which endpoint serves a request, and how its calls may be substituted.
#[derive(Clone)]
pub struct Route {
    pub api_version: String,
    pub endpoint: Arc<dyn Endpoint>,
    pub substitution: SubstitutionMode,
}

impl Route {
    pub fn new(api_version: impl Into<String>, endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            api_version: api_version.into(),
            endpoint,
            substitution: SubstitutionMode::Off,
        }
    }

    pub fn with_substitution(mut self, mode: SubstitutionMode) -> Self {
        self.substitution = mode;
        self
    }
}

/// The single rendered response of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
