#![forbid(unsafe_code)]

pub mod app_log;
pub mod cache;
pub mod config;
pub mod context;
pub mod contract;
pub mod diagnostics;
pub mod dispatch;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod events;
pub mod manifest;
pub mod middleware;
pub mod mock;
pub mod workflow;

pub use crate::app_log::{AppLogConfig, AppLogger, LogLevel};
pub use crate::cache::{client_cache_key, response_cache_key, CachedResponse, CLIENT_CACHE_PREFIX};
pub use crate::config::EngineConfig;
pub use crate::context::{CallStatus, ExecutionContext, InterceptContext, Library, MockContext};
pub use crate::diagnostics::{diagnose, Diagnosis, ScriptUnit};
pub use crate::dispatch::{
    HttpClient, HttpError, HttpRequestParts, HttpResponseParts, ReqwestHttpClient,
};
pub use crate::endpoint::{Endpoint, FnEndpoint, InboundRequest, Response, Route};
pub use crate::engine::Engine;
pub use crate::error::{ScriptError, ScriptSource, SourceFrame};
pub use crate::events::{
    CompositeHttpLogSink, HttpLogEvent, HttpLogSink, NoOpHttpLogSink, StdoutHttpLogSink,
    TracingHttpLogSink,
};
pub use crate::manifest::{ManifestEndpoint, ManifestError};
pub use crate::middleware::{Middleware, MiddlewareRegistry};
pub use crate::mock::{
    DependencyKeyResolver, InMemoryMockRegistry, InterceptScript, MockCatalog, MockDescriptor,
    MockLookup, MockRegistry, MockRegistryError, MockScript, MockSupport, PrefixKeyResolver,
    Rewrite, SubstitutionMode,
};
pub use crate::workflow::{CallId, CallMeta, CallRecord, CallState, ResponseHeaders, Substitution, Workflow};
