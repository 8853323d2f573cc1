mod headers;
mod invocation;
mod writes;

pub use headers::{POWERED_BY, POWERED_BY_HEADER};

use std::sync::Arc;

use destiny_store::CacheStore;
use serde_json::Value;
use tracing::Instrument;

use crate::app_log::AppLogConfig;
use crate::config::EngineConfig;
use crate::context::Library;
use crate::dispatch::{HttpClient, ReqwestHttpClient};
use crate::endpoint::{InboundRequest, Response, Route};
use crate::events::{HttpLogSink, TracingHttpLogSink};
use crate::middleware::{Middleware, MiddlewareRegistry};
use crate::mock::MockSupport;

use invocation::Invocation;
use writes::CacheWrites;

/// Serves requests against endpoints; cheap to share behind an `Arc`.
pub struct Engine {
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) api_config: Arc<Value>,
    pub(crate) app_log: Arc<AppLogConfig>,
    pub(crate) http: Arc<dyn HttpClient>,
    pub(crate) cache: Option<Arc<dyn CacheStore>>,
    pub(crate) sink: Arc<dyn HttpLogSink>,
    pub(crate) middleware: MiddlewareRegistry,
    pub(crate) library: Arc<Library>,
    pub(crate) mocks: Option<MockSupport>,
    pub(crate) writes: CacheWrites,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let http: Arc<dyn HttpClient> = match ReqwestHttpClient::new(&config.user_agent) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::warn!(target: "destiny", "falling back to default http client: {e}");
                Arc::new(ReqwestHttpClient::default())
            }
        };
        Self {
            api_config: Arc::new(config.api_context_config.clone()),
            app_log: Arc::new(config.app_log.clone()),
            config: Arc::new(config),
            http,
            cache: None,
            sink: Arc::new(TracingHttpLogSink),
            middleware: MiddlewareRegistry::new(),
            library: Arc::new(Library::new()),
            mocks: None,
            writes: CacheWrites::default(),
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_http_log(mut self, sink: Arc<dyn HttpLogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_middleware(mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.register(name, middleware);
        self
    }

    pub fn with_library(mut self, library: Library) -> Self {
        self.library = Arc::new(library);
        self
    }

    pub fn with_mocks(mut self, mocks: MockSupport) -> Self {
        self.mocks = Some(mocks);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Wait for client cache writes queued by earlier requests.
    ///
    /// `handle` returns without waiting for them; dropping the engine aborts
    /// the ones still running.
    pub async fn flush_cache_writes(&self) {
        self.writes.flush().await;
    }

    /// Run one request to completion and return its only response.
    pub async fn handle(&self, route: &Route, request: InboundRequest) -> Response {
        let span = tracing::debug_span!(
            target: "destiny",
            "request",
            path = %request.path,
            version = %route.api_version,
            endpoint = %route.endpoint.name(),
        );
        Invocation::new(self, route, &request)
            .run(request)
            .instrument(span)
            .await
    }
}
