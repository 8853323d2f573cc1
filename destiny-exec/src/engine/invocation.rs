use std::collections::BTreeMap;
use std::sync::Arc;

use destiny_core::{CallSpec, ClientError, ErrorKind, OutputKind};
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use tokio::time::Instant;

use super::headers;
use super::Engine;
use crate::app_log::AppLogger;
use crate::cache::{self, client_cache_key, response_cache_key, CachedResponse};
use crate::context::{CallStatus, ExecutionContext};
use crate::contract::{cast_inputs, check_output};
use crate::diagnostics::{diagnose, ScriptUnit};
use crate::dispatch::call::{dispatch, CallEnv, CallJob, Outcome, Settlement};
use crate::dispatch::response::is_success;
use crate::dispatch::{build_request, outbound_headers, substitute_rest_ids};
use crate::endpoint::{InboundRequest, Response, Route};
use crate::error::{ScriptError, ScriptSource};
use crate::events::{
    HttpLogEvent, APPLICATION_MSG, DEPENDPOINT_NOT_OK, DEPENDPOINT_TIMED_OUT, DURATION_EXCEEDED, SCRIPT_ERROR,
    SERVER_ERROR,
};
use crate::workflow::{CallId, CallState, Queued, Workflow};

enum Completion {
    Call(Settlement),
    CacheGet { key: String, value: Option<String> },
}

/// One request from registration to its single response.
pub(crate) struct Invocation<'a> {
    engine: &'a Engine,
    route: &'a Route,
    path: String,
    ctx: ExecutionContext,
    wf: Workflow,
    env: Arc<CallEnv>,
    inflight: FuturesUnordered<BoxFuture<'static, Completion>>,
    response_cache: Option<(String, u64)>,
    started: Instant,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(engine: &'a Engine, route: &'a Route, request: &InboundRequest) -> Self {
        let log = AppLogger::new(engine.app_log.clone());
        let ctx = ExecutionContext::new(engine.api_config.clone(), engine.library.clone(), log);
        let env = Arc::new(CallEnv {
            http: engine.http.clone(),
            max_response_bytes: engine.config.max_response_bytes,
            mode: route.substitution.clone(),
            support: engine.mocks.clone(),
            api_version: route.api_version.clone(),
            mock_ctx: ctx.mock_context(),
        });
        let wf = Workflow::new(
            route.endpoint.contract().output.clone(),
            &request.headers,
            request.id_path.clone(),
            request.id_map.clone(),
        );
        Self {
            engine,
            route,
            path: request.path.clone(),
            ctx,
            wf,
            env,
            inflight: FuturesUnordered::new(),
            response_cache: None,
            started: Instant::now(),
        }
    }

    pub(crate) async fn run(mut self, request: InboundRequest) -> Response {
        self.prepare(&request).await;
        self.forward_app_logs().await;

        let mut from_cache = false;
        if !self.wf.has_error() {
            from_cache = self.lookup_response_cache().await;
        }
        if !self.wf.has_error() && !from_cache {
            self.invoke_request().await;
            self.barrier().await;
        }

        self.render(from_cache).await
    }

    /// Registration, contract checks, header generation, middleware and input casting.
    async fn prepare(&mut self, request: &InboundRequest) {
        let route = self.route;
        let endpoint = &route.endpoint;

        if let Err(e) = endpoint.register(&mut self.ctx) {
            self.report(endpoint.name(), endpoint.source(), "register", e).await;
            return;
        }
        if !self.ctx.has_request() {
            self.wf.error(ClientError::server(format!(
                "request handler is missing in {}",
                endpoint.name()
            )));
            return;
        }
        if let OutputKind::Invalid(_) = endpoint.contract().output.kind {
            self.wf.error(ClientError::server(format!(
                "output type is not valid in {}",
                endpoint.name()
            )));
            return;
        }

        headers::generate(&self.engine.config.header_parameters, request, &mut self.wf);

        for name in &endpoint.config().middleware {
            let Some(middleware) = self.engine.middleware.get(name).cloned() else {
                tracing::error!(target: "destiny", "unknown middleware '{name}' in {}", endpoint.name());
                self.wf
                    .error(ClientError::server(format!("unknown middleware: {name}")));
                return;
            };
            if let Err(e) = middleware.request(request, &mut self.wf, &mut self.ctx).await {
                self.report(name, None, "request()", e).await;
            }
            if self.wf.has_error() {
                return;
            }
        }

        match cast_inputs(&endpoint.contract().input, &request.params) {
            Ok(params) => self.wf.set_params(params),
            Err(e) => self.wf.error(e),
        }
    }

    /// Serve from the response cache when the endpoint enables it.
    async fn lookup_response_cache(&mut self) -> bool {
        let Some(store) = self.engine.cache.clone() else {
            return false;
        };
        let Some(seconds) = self.route.endpoint.config().response_cache_duration() else {
            return false;
        };
        let key = response_cache_key(&self.path, self.wf.params());
        let cached = cache::lookup(store.as_ref(), &key).await;
        self.response_cache = Some((key, seconds.unsigned_abs()));

        match cached {
            Some(CachedResponse { headers, output }) => {
                tracing::debug!(target: "destiny", "serving {} from response cache", self.path);
                self.wf.restore(headers, output);
                true
            }
            None => false,
        }
    }

    async fn invoke_request(&mut self) {
        let route = self.route;
        if let Some(Err(e)) = self.ctx.run_request(&mut self.wf) {
            self.report(route.endpoint.name(), route.endpoint.source(), "request()", e)
                .await;
        }
        self.drain();
        self.forward_app_logs().await;
    }

    /// Wait for outstanding calls until an error is set or nothing is pending.
    async fn barrier(&mut self) {
        loop {
            if self.wf.has_error() {
                return;
            }
            if !self.wf.has_pending() {
                self.finalize().await;
                return;
            }
            let Some(completion) = self.inflight.next().await else {
                tracing::warn!(target: "destiny", "pending calls with nothing in flight in {}", self.path);
                self.finalize().await;
                return;
            };
            match completion {
                Completion::Call(settlement) => self.settle_call(settlement).await,
                Completion::CacheGet { key, value } => self.settle_cache_get(key, value).await,
            }
            self.drain();
            self.forward_app_logs().await;
        }
    }

    /// Start everything handlers queued since the last drain.
    fn drain(&mut self) {
        for queued in self.wf.take_queue() {
            match queued {
                Queued::Call {
                    id,
                    ticket,
                    target,
                    spec,
                } => self.start_call(id, ticket, target, spec),
                Queued::CacheGet { key } => {
                    let store = self.engine.cache.clone();
                    self.inflight.push(Box::pin(async move {
                        let value = match store {
                            Some(store) => match store.get(&client_cache_key(&key)).await {
                                Ok(value) => value,
                                Err(e) => {
                                    tracing::warn!(target: "destiny", "client cache read failed for {key}: {e}");
                                    None
                                }
                            },
                            None => None,
                        };
                        Completion::CacheGet { key, value }
                    }));
                }
                Queued::CachePut {
                    key,
                    value,
                    ttl_seconds,
                } => {
                    let Some(store) = self.engine.cache.clone() else {
                        tracing::debug!(target: "destiny", "no cache store, dropping write of {key}");
                        continue;
                    };
                    self.engine.writes.spawn(async move {
                        cache::write(store.as_ref(), &client_cache_key(&key), &value, ttl_seconds)
                            .await;
                    });
                }
            }
        }
    }

    fn start_call(&mut self, id: CallId, ticket: u64, target: String, spec: CallSpec) {
        let url = match substitute_rest_ids(&target, &spec.rest_ids) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(target: "destiny", "{e}");
                self.wf.settle(&id, CallState::Failed, &target);
                self.wf.error(e.to_client_error());
                return;
            }
        };
        let headers = outbound_headers(
            &self.engine.config.header_parameters,
            self.wf.headers(),
            &spec.headers,
        );
        let request = match build_request(&url, &spec, headers) {
            Ok(request) => request,
            Err(e) => {
                self.wf.settle(&id, CallState::Failed, &url);
                self.wf.error(e);
                return;
            }
        };

        let job = CallJob {
            id,
            ticket,
            target,
            spec,
            request,
        };
        let env = self.env.clone();
        self.inflight
            .push(Box::pin(async move { Completion::Call(dispatch(job, env).await) }));
    }

    async fn settle_call(&mut self, settlement: Settlement) {
        let Settlement {
            id,
            ticket,
            spec,
            depend_url,
            substitution,
            outcome,
        } = settlement;
        if !self.wf.is_current(&id, ticket) {
            tracing::debug!(target: "destiny", "ignoring stale settlement of {id}");
            return;
        }
        if let Some(substitution) = substitution {
            self.wf.set_substitution(&id, substitution);
        }

        match outcome {
            Outcome::Delivered { status, body } if is_success(status.code) => {
                self.wf.settle(&id, CallState::Succeeded, &depend_url);
                self.on_results(&id, status, body).await;
            }
            Outcome::Delivered { status, body } => {
                self.on_not_ok(&id, &spec, &depend_url, status, body).await;
            }
            Outcome::Transport { error } => {
                let status = CallStatus {
                    error: Some(error),
                    ..CallStatus::default()
                };
                self.on_not_ok(&id, &spec, &depend_url, status, Value::Null).await;
            }
            Outcome::TimedOut => self.on_timeout(&id, &spec, &depend_url).await,
            Outcome::Rejected(e) => {
                self.wf.settle(&id, CallState::Failed, &depend_url);
                self.wf.error(e);
            }
            Outcome::ScriptFault {
                unit,
                source,
                method,
                error,
            } => {
                self.wf.settle(&id, CallState::Failed, &depend_url);
                self.report(&unit, source.as_ref(), &method, error).await;
            }
        }
    }

    async fn on_results(&mut self, id: &str, status: CallStatus, body: Value) {
        let route = self.route;
        match self.ctx.run_results(id, &mut self.wf, status, body) {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                let method = format!("results(\"{id}\")");
                self.report(route.endpoint.name(), route.endpoint.source(), &method, e)
                    .await;
            }
            None => self
                .wf
                .error(ClientError::server(format!("no results handler for {id}"))),
        }
    }

    async fn on_not_ok(
        &mut self,
        id: &str,
        spec: &CallSpec,
        depend_url: &str,
        status: CallStatus,
        body: Value,
    ) {
        self.wf.settle(id, CallState::Failed, depend_url);
        self.http_log(
            DEPENDPOINT_NOT_OK,
            json!({ "dependUrl": depend_url, "code": status.code, "error": status.error }),
        )
        .await;

        let absorbed = self.on_exception(id, status, body).await;
        if !absorbed && !spec.allow_error {
            self.wf.error(ClientError::new(
                ErrorKind::Error,
                format!("request error for: {id}"),
            ));
        }
    }

    async fn on_timeout(&mut self, id: &str, spec: &CallSpec, depend_url: &str) {
        self.wf.settle(id, CallState::TimedOut, depend_url);
        self.http_log(
            DEPENDPOINT_TIMED_OUT,
            json!({ "dependUrl": depend_url, "dependTimeout": spec.timeout }),
        )
        .await;

        let status = CallStatus {
            timed_out: true,
            ..CallStatus::default()
        };
        let absorbed = self.on_exception(id, status, Value::Null).await;
        if !absorbed && !spec.allow_timeout {
            tracing::info!(target: "destiny", "request timed out: {id}");
            self.wf
                .error(ClientError::new(ErrorKind::Timeout, "request timed out"));
        }
    }

    /// Returns false when no exception handler is bound for `id`.
    async fn on_exception(&mut self, id: &str, status: CallStatus, body: Value) -> bool {
        let route = self.route;
        match self.ctx.run_exception(id, &mut self.wf, status, body) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                let method = format!("exception(\"{id}\")");
                self.report(route.endpoint.name(), route.endpoint.source(), &method, e)
                    .await;
                true
            }
            None => false,
        }
    }

    async fn settle_cache_get(&mut self, key: String, value: Option<String>) {
        if !self.wf.finish_cache_call(&key) {
            return;
        }
        let route = self.route;
        let (result, method, missing) = match value {
            Some(value) => (
                self.ctx.run_cache_get_results(&key, &mut self.wf, value),
                format!("cacheGetResults(\"{key}\")"),
                "no cache get results handler for",
            ),
            None => (
                self.ctx.run_cache_get_exception(&key, &mut self.wf),
                format!("cacheGetException(\"{key}\")"),
                "no cache get exception handler for",
            ),
        };
        match result {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                self.report(route.endpoint.name(), route.endpoint.source(), &method, e)
                    .await
            }
            None => self.wf.error(ClientError::server(format!("{missing} {key}"))),
        }
    }

    async fn finalize(&mut self) {
        self.wf.set_finalizing();
        let route = self.route;
        if let Some(Err(e)) = self.ctx.run_finalize(&mut self.wf) {
            self.report(route.endpoint.name(), route.endpoint.source(), "finalize()", e)
                .await;
        }
        if self.wf.has_error() {
            return;
        }
        if let Err(e) = check_output(self.wf.contract(), self.wf.output_value()) {
            self.wf.error(e);
        }
    }

    async fn render(&mut self, from_cache: bool) -> Response {
        self.wf.mark_rendered();
        self.inflight = FuturesUnordered::new();
        self.forward_app_logs().await;
        self.log_duration().await;

        let response = match self.wf.error_value().cloned() {
            Some(err) => {
                self.http_log(
                    SERVER_ERROR,
                    json!({ "code": err.status(), "serverError": err.to_body() }),
                )
                .await;
                Response {
                    status: err.status(),
                    headers: BTreeMap::new(),
                    body: err.to_body(),
                }
            }
            None => {
                let response = Response {
                    status: 200,
                    headers: self.wf.headers().client.clone(),
                    body: self.wf.output_value().clone(),
                };
                if let (false, Some(store), Some((key, seconds))) =
                    (from_cache, &self.engine.cache, &self.response_cache)
                {
                    let cached = CachedResponse {
                        headers: response.headers.clone(),
                        output: response.body.clone(),
                    };
                    cache::store_response(store.as_ref(), key, &cached, *seconds).await;
                }
                response
            }
        };

        response
    }

    async fn log_duration(&mut self) {
        let elapsed = self.started.elapsed();
        let limit = self.engine.config.duration_warning_limit();
        if elapsed <= limit {
            return;
        }
        let depend_points: Vec<Value> = self
            .wf
            .calls()
            .values()
            .map(|record| {
                let mut point = json!({
                    "dependPoint": record.meta.depend_url,
                    "duration": record.meta.duration().map(|d| d.as_millis() as u64),
                });
                if record.meta.timed_out {
                    point["timedOut"] = Value::Bool(true);
                }
                point
            })
            .collect();
        self.http_log(
            DURATION_EXCEEDED,
            json!({
                "duration": elapsed.as_millis() as u64,
                "durationLimit": limit.as_millis() as u64,
                "dependPoints": depend_points,
            }),
        )
        .await;
    }

    async fn report(
        &mut self,
        unit: &str,
        source: Option<&ScriptSource>,
        method: &str,
        err: ScriptError,
    ) {
        let Some(diagnosis) = diagnose(ScriptUnit::new(unit, source), method, err) else {
            return;
        };
        self.wf.error(diagnosis.error);
        self.http_log(SCRIPT_ERROR, diagnosis.event_meta).await;
    }

    /// Send records the `log()` capability queued for the http log.
    async fn forward_app_logs(&mut self) {
        let records = self.ctx.log().take_forwarded();
        for record in records {
            self.http_log(APPLICATION_MSG, record.meta()).await;
        }
    }

    async fn http_log(&mut self, msg: &str, meta: Value) {
        let event = self.http_event(msg, meta);
        let engine = self.engine;
        engine.sink.emit(event).await;
    }

    fn http_event(&self, msg: &str, meta: Value) -> HttpLogEvent {
        let headers = self.wf.headers();
        let header_parameters = self
            .engine
            .config
            .header_parameters
            .iter()
            .filter(|hp| hp.http_log)
            .map(|hp| {
                let value = if hp.return_in_response {
                    headers.client.get(&hp.name)
                } else {
                    headers.internal.get(&hp.name)
                };
                (
                    hp.name.clone(),
                    value.map_or(Value::Null, |v| Value::String(v.clone())),
                )
            })
            .collect();
        HttpLogEvent {
            msg: msg.to_string(),
            url: self.path.clone(),
            api_version: self.route.api_version.clone(),
            meta,
            header_parameters,
        }
    }
}
