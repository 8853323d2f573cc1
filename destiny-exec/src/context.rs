use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::app_log::AppLogger;
use crate::error::ScriptError;
use crate::workflow::Workflow;

/// Outcome details handed to results and exception handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStatus {
    /// HTTP status; `0` for transport failures and timeouts.
    pub code: u16,
    pub headers: std::collections::BTreeMap<String, String>,
    pub timed_out: bool,
    pub error: Option<String>,
}

impl CallStatus {
    pub fn with_code(code: u16) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }
}

pub type RequestHandler =
    Box<dyn FnMut(&mut ExecutionContext, &mut Workflow) -> Result<(), ScriptError> + Send>;
pub type ResultsHandler = Box<
    dyn FnMut(&mut ExecutionContext, &mut Workflow, CallStatus, Value) -> Result<(), ScriptError>
        + Send,
>;
pub type ExceptionHandler = ResultsHandler;
pub type FinalizeHandler = RequestHandler;
pub type CacheResultsHandler = Box<
    dyn FnMut(&mut ExecutionContext, &mut Workflow, String) -> Result<(), ScriptError> + Send,
>;
pub type CacheExceptionHandler = RequestHandler;

/// Shared code and data endpoint code can reach: `include` globals and `resource` values.
#[derive(Clone, Default)]
pub struct Library {
    globals: HashMap<String, Arc<dyn Any + Send + Sync>>,
    resources: HashMap<String, Value>,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.globals.insert(name.into(), Arc::new(value));
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, value: Value) -> Self {
        self.resources.insert(name.into(), value);
        self
    }

    pub fn global<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.globals.get(name)?.clone().downcast::<T>().ok()
    }

    pub fn resource(&self, name: &str) -> Option<&Value> {
        self.resources.get(name)
    }
}

/// Capabilities available to mock and interceptor code.
#[derive(Debug, Clone)]
pub struct MockContext {
    config: Arc<Value>,
    library: Arc<Library>,
    log: AppLogger,
}

pub type InterceptContext = MockContext;

impl MockContext {
    pub(crate) fn new(config: Arc<Value>, library: Arc<Library>, log: AppLogger) -> Self {
        Self {
            config,
            library,
            log,
        }
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn log(&self) -> &AppLogger {
        &self.log
    }

    pub fn include<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.library.global(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Request,
    Finalize,
    Results,
    Exception,
    CacheGetResults,
    CacheGetException,
}

/// The capability surface of one endpoint invocation.
///
/// Each handler key binds once; binding it again is an error, also while
/// that handler is running.
pub struct ExecutionContext {
    config: Arc<Value>,
    library: Arc<Library>,
    log: AppLogger,
    bound: HashSet<(Slot, String)>,
    request: Option<RequestHandler>,
    finalize: Option<FinalizeHandler>,
    results: HashMap<String, ResultsHandler>,
    exception: HashMap<String, ExceptionHandler>,
    cache_get_results: HashMap<String, CacheResultsHandler>,
    cache_get_exception: HashMap<String, CacheExceptionHandler>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request", &self.request.is_some())
            .field("finalize", &self.finalize.is_some())
            .field("results", &self.results.keys().collect::<Vec<_>>())
            .field("exception", &self.exception.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    pub(crate) fn new(config: Arc<Value>, library: Arc<Library>, log: AppLogger) -> Self {
        Self {
            config,
            library,
            log,
            bound: HashSet::new(),
            request: None,
            finalize: None,
            results: HashMap::new(),
            exception: HashMap::new(),
            cache_get_results: HashMap::new(),
            cache_get_exception: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn include<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.library.global(name)
    }

    pub fn log(&self) -> &AppLogger {
        &self.log
    }

    pub fn resource(&self, name: &str) -> Result<&Value, ScriptError> {
        self.library
            .resource(name)
            .ok_or_else(|| ScriptError::new(format!("there is no resource: {name}")))
    }

    pub fn request<F>(&mut self, handler: F) -> Result<(), ScriptError>
    where
        F: FnMut(&mut ExecutionContext, &mut Workflow) -> Result<(), ScriptError> + Send + 'static,
    {
        if !self.bind(Slot::Request, "") {
            return Err(ScriptError::new("request already called"));
        }
        self.request = Some(Box::new(handler));
        Ok(())
    }

    pub fn finalize<F>(&mut self, handler: F) -> Result<(), ScriptError>
    where
        F: FnMut(&mut ExecutionContext, &mut Workflow) -> Result<(), ScriptError> + Send + 'static,
    {
        if !self.bind(Slot::Finalize, "") {
            return Err(ScriptError::new("finalize already called"));
        }
        self.finalize = Some(Box::new(handler));
        Ok(())
    }

    pub fn results<F>(&mut self, id: impl Into<String>, handler: F) -> Result<(), ScriptError>
    where
        F: FnMut(&mut ExecutionContext, &mut Workflow, CallStatus, Value) -> Result<(), ScriptError>
            + Send
            + 'static,
    {
        let id = id.into();
        if !self.bind(Slot::Results, &id) {
            return Err(ScriptError::new(format!("results already called with key {id}")));
        }
        self.results.insert(id, Box::new(handler));
        Ok(())
    }

    pub fn exception<F>(&mut self, id: impl Into<String>, handler: F) -> Result<(), ScriptError>
    where
        F: FnMut(&mut ExecutionContext, &mut Workflow, CallStatus, Value) -> Result<(), ScriptError>
            + Send
            + 'static,
    {
        let id = id.into();
        if !self.bind(Slot::Exception, &id) {
            return Err(ScriptError::new(format!("exception already called with key {id}")));
        }
        self.exception.insert(id, Box::new(handler));
        Ok(())
    }

    pub fn cache_get_results<F>(&mut self, key: impl Into<String>, handler: F) -> Result<(), ScriptError>
    where
        F: FnMut(&mut ExecutionContext, &mut Workflow, String) -> Result<(), ScriptError>
            + Send
            + 'static,
    {
        let key = key.into();
        if !self.bind(Slot::CacheGetResults, &key) {
            return Err(ScriptError::new(format!(
                "cache get results already called with key {key}"
            )));
        }
        self.cache_get_results.insert(key, Box::new(handler));
        Ok(())
    }

    pub fn cache_get_exception<F>(&mut self, key: impl Into<String>, handler: F) -> Result<(), ScriptError>
    where
        F: FnMut(&mut ExecutionContext, &mut Workflow) -> Result<(), ScriptError> + Send + 'static,
    {
        let key = key.into();
        if !self.bind(Slot::CacheGetException, &key) {
            return Err(ScriptError::new(format!(
                "cache get exception already called with key {key}"
            )));
        }
        self.cache_get_exception.insert(key, Box::new(handler));
        Ok(())
    }

    /// Returns false when the key was bound before.
    fn bind(&mut self, slot: Slot, key: &str) -> bool {
        self.bound.insert((slot, key.to_string()))
    }

    pub fn has_request(&self) -> bool {
        self.bound.contains(&(Slot::Request, String::new()))
    }

    pub(crate) fn mock_context(&self) -> MockContext {
        MockContext::new(self.config.clone(), self.library.clone(), self.log.clone())
    }

    // Handlers are taken out while they run so they can use the context. Their
    // keys stay bound, so the slot is still empty when they are put back.

    pub(crate) fn run_request(&mut self, wf: &mut Workflow) -> Option<Result<(), ScriptError>> {
        let mut handler = self.request.take()?;
        let result = handler(self, wf);
        self.request = Some(handler);
        Some(result)
    }

    pub(crate) fn run_finalize(&mut self, wf: &mut Workflow) -> Option<Result<(), ScriptError>> {
        let mut handler = self.finalize.take()?;
        let result = handler(self, wf);
        self.finalize = Some(handler);
        Some(result)
    }

    pub(crate) fn run_results(
        &mut self,
        id: &str,
        wf: &mut Workflow,
        status: CallStatus,
        body: Value,
    ) -> Option<Result<(), ScriptError>> {
        let mut handler = self.results.remove(id)?;
        let result = handler(self, wf, status, body);
        self.results.insert(id.to_string(), handler);
        Some(result)
    }

    pub(crate) fn run_exception(
        &mut self,
        id: &str,
        wf: &mut Workflow,
        status: CallStatus,
        body: Value,
    ) -> Option<Result<(), ScriptError>> {
        let mut handler = self.exception.remove(id)?;
        let result = handler(self, wf, status, body);
        self.exception.insert(id.to_string(), handler);
        Some(result)
    }

    pub(crate) fn run_cache_get_results(
        &mut self,
        key: &str,
        wf: &mut Workflow,
        value: String,
    ) -> Option<Result<(), ScriptError>> {
        let mut handler = self.cache_get_results.remove(key)?;
        let result = handler(self, wf, value);
        self.cache_get_results.insert(key.to_string(), handler);
        Some(result)
    }

    pub(crate) fn run_cache_get_exception(
        &mut self,
        key: &str,
        wf: &mut Workflow,
    ) -> Option<Result<(), ScriptError>> {
        let mut handler = self.cache_get_exception.remove(key)?;
        let result = handler(self, wf);
        self.cache_get_exception.insert(key.to_string(), handler);
        Some(result)
    }
}
