mod common;

use std::sync::Arc;
use std::time::Duration;

use destiny_core::{
    CallSpec, EndpointContract, FieldType, InputContract, MockSelection, OutputContract, ParamMap,
    TestCallConfig, TestConfig,
};
use destiny_exec::{
    AppLogConfig, CallStatus, EngineConfig, FnEndpoint, InMemoryMockRegistry, InboundRequest,
    InterceptContext, InterceptScript, LogLevel, MockCatalog, MockContext, MockDescriptor,
    MockScript, MockSupport, PrefixKeyResolver, Rewrite, Route, ScriptError, SubstitutionMode,
};
use serde_json::{json, Value};

use common::{engine, FakeHttpClient, RecordingSink, Reply};

fn driver_endpoint() -> Arc<FnEndpoint> {
    Arc::new(FnEndpoint::new(
        "driver.js",
        EndpointContract::new(
            InputContract::default().optional("id", FieldType::String),
            OutputContract::object().optional("driver", FieldType::Object),
        ),
        |ctx| {
            ctx.request(|_ctx, wf| {
                let id = wf.param("id").cloned().unwrap_or(json!("1"));
                wf.call_as("driver", "http://drivers.test/driver", CallSpec::get().param("id", id))
            })?;
            ctx.results("driver", |_ctx, wf, _status, body| wf.output("driver", body))
        },
    ))
}

struct EchoMock;

impl MockScript for EchoMock {
    fn get_results(&self, ctx: &MockContext, params: &ParamMap, status: u16) -> Result<Value, ScriptError> {
        Ok(json!({
            "id": params.get("id").cloned().unwrap_or(Value::Null),
            "status": status,
            "region": ctx.config()["region"].clone(),
        }))
    }
}

struct ChattyMock;

impl MockScript for ChattyMock {
    fn get_results(&self, ctx: &MockContext, params: &ParamMap, _status: u16) -> Result<Value, ScriptError> {
        let id = params.get("id").cloned().unwrap_or(Value::Null);
        ctx.log().debug("mocks.drivers", "not forwarded");
        ctx.log().warn("mocks.drivers", format!("serving id {id}"));
        Ok(json!({"name": "chatty"}))
    }
}

struct UppercaseName;

impl InterceptScript for UppercaseName {
    fn intercept_results(
        &self,
        _ctx: &InterceptContext,
        _params: &ParamMap,
        status: &CallStatus,
        mut response: Value,
        rewrite: &mut Rewrite,
    ) -> Result<(), ScriptError> {
        let name = response["name"].as_str().unwrap_or_default().to_uppercase();
        response["name"] = json!(name);
        response["seen"] = json!(status.code);
        rewrite.results(response);
        Ok(())
    }
}

struct ForgetfulInterceptor;

impl InterceptScript for ForgetfulInterceptor {
    fn intercept_results(
        &self,
        _ctx: &InterceptContext,
        _params: &ParamMap,
        _status: &CallStatus,
        _response: Value,
        _rewrite: &mut Rewrite,
    ) -> Result<(), ScriptError> {
        Ok(())
    }
}

fn support() -> MockSupport {
    MockSupport::new(
        Arc::new(PrefixKeyResolver::new().with("http://drivers.test/", "Drivers")),
        MockCatalog::new()
            .with_mock("Drivers", "happy", MockDescriptor::Static(json!({"name": "mock"})))
            .with_mock("Drivers", "echo", MockDescriptor::Script(Arc::new(EchoMock)))
            .with_mock("Drivers", "chatty", MockDescriptor::Script(Arc::new(ChattyMock)))
            .with_interceptor("Drivers", "upper", Arc::new(UppercaseName))
            .with_interceptor("Drivers", "forgetful", Arc::new(ForgetfulInterceptor)),
    )
}

fn test_config(mock: &str, latency: Option<u64>, status: Option<u16>) -> TestConfig {
    let mut config = TestConfig::new();
    config.insert(
        "Drivers".to_string(),
        TestCallConfig {
            mock: mock.to_string(),
            latency,
            status,
        },
    );
    config
}

fn real_http() -> Arc<FakeHttpClient> {
    Arc::new(
        FakeHttpClient::new()
            .route("http://drivers.test/", Reply::json(200, json!({"name": "lewis"}))),
    )
}

#[tokio::test(start_paused = true)]
async fn test_mode_serves_the_pinned_mock_after_its_latency() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let route = Route::new("1.0.0", driver_endpoint())
        .with_substitution(SubstitutionMode::Test(test_config("happy", Some(80), None)));

    let started = tokio::time::Instant::now();
    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&route, InboundRequest::get("/driver"))
        .await;

    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"driver": {"name": "mock"}}));
    assert!(http.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn mock_status_routes_to_the_exception_path() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let route = Route::new("1.0.0", driver_endpoint())
        .with_substitution(SubstitutionMode::Test(test_config("happy", None, Some(404))));

    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&route, InboundRequest::get("/driver"))
        .await;

    assert_eq!(response.body["msg"], json!("request error for: driver"));
    let event = sink.find("Dependpoint not ok").expect("not ok event");
    assert_eq!(event.meta["code"], json!(404));
    assert_eq!(
        event.meta["dependUrl"],
        json!("[mock] http://drivers.test/driver?id=1")
    );
}

#[tokio::test(start_paused = true)]
async fn script_mock_receives_params_status_and_config() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let config = EngineConfig::default().with_api_context_config(json!({"region": "eu"}));
    let route = Route::new("1.0.0", driver_endpoint())
        .with_substitution(SubstitutionMode::Test(test_config("echo", None, Some(201))));

    let response = common::engine_with(config, &http, &sink)
        .with_mocks(support())
        .handle(&route, InboundRequest::get("/driver").param("id", "44"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        json!({"driver": {"id": "44", "status": 201, "region": "eu"}})
    );
}

#[tokio::test(start_paused = true)]
async fn mock_log_messages_reach_the_http_log() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let app_log = AppLogConfig {
        http_threshold: LogLevel::Warn,
        ..AppLogConfig::default()
    }
    .with_tag("mocks", LogLevel::Info);
    let config = EngineConfig::default().with_app_log(app_log);
    let route = Route::new("1.0.0", driver_endpoint())
        .with_substitution(SubstitutionMode::Test(test_config("chatty", None, None)));

    let response = common::engine_with(config, &http, &sink)
        .with_mocks(support())
        .handle(&route, InboundRequest::get("/driver").param("id", "44"))
        .await;

    assert_eq!(response.body, json!({"driver": {"name": "chatty"}}));
    let events: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| e.msg == "Application Msg")
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].meta,
        json!({"level": "WARN", "msg": "[mocks.drivers] serving id \"44\""})
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_pinned_mock_is_a_server_error() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let route = Route::new("1.0.0", driver_endpoint())
        .with_substitution(SubstitutionMode::Test(test_config("sad", None, None)));

    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&route, InboundRequest::get("/driver"))
        .await;

    assert_eq!(response.body, json!({"error": "server", "msg": "No mock sad"}));
    assert!(http.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unmatched_dependency_goes_out_for_real() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let mut config = test_config("happy", None, None);
    let entry = config.remove("Drivers").unwrap();
    config.insert("Teams".to_string(), entry);
    let route = Route::new("1.0.0", driver_endpoint()).with_substitution(SubstitutionMode::Test(config));

    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&route, InboundRequest::get("/driver"))
        .await;

    assert_eq!(response.body, json!({"driver": {"name": "lewis"}}));
    assert_eq!(http.requests().len(), 1);
}

fn dev_route(registry: Arc<InMemoryMockRegistry>) -> Route {
    Route::new("dev", driver_endpoint()).with_substitution(SubstitutionMode::Dev {
        registry,
        mock_version: "v1".to_string(),
    })
}

#[tokio::test(start_paused = true)]
async fn dev_interceptor_rewrites_the_real_response() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let registry = Arc::new(InMemoryMockRegistry::new());
    registry
        .set("v1:int/drivers", MockSelection::named("upper").with_latency(20).with_status(203))
        .await;

    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&dev_route(registry), InboundRequest::get("/driver"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"driver": {"name": "LEWIS", "seen": 200}}));
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dev_interceptor_status_decides_routing() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let registry = Arc::new(InMemoryMockRegistry::new());
    registry
        .set("v1:int/drivers", MockSelection::named("upper").with_status(500))
        .await;

    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&dev_route(registry), InboundRequest::get("/driver"))
        .await;

    assert_eq!(response.body["msg"], json!("request error for: driver"));
}

#[tokio::test(start_paused = true)]
async fn dev_mock_replaces_the_call() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let registry = Arc::new(InMemoryMockRegistry::new());
    registry.set("v1:drivers", MockSelection::named("happy")).await;

    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&dev_route(registry.clone()), InboundRequest::get("/driver"))
        .await;
    assert_eq!(response.body, json!({"driver": {"name": "mock"}}));
    assert!(http.requests().is_empty());

    registry.clear("v1:drivers").await;
    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&dev_route(registry), InboundRequest::get("/driver"))
        .await;
    assert_eq!(response.body, json!({"driver": {"name": "lewis"}}));
}

#[tokio::test(start_paused = true)]
async fn interceptor_that_sets_no_results_faults() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let registry = Arc::new(InMemoryMockRegistry::new());
    registry
        .set("v1:int/drivers", MockSelection::named("forgetful"))
        .await;

    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&dev_route(registry), InboundRequest::get("/driver"))
        .await;

    assert_eq!(response.body, json!({"error": "server", "msg": "server error"}));
    let event = sink.find("Server Error").expect("diagnostic event");
    assert_eq!(
        event.meta["trace"],
        json!("interceptor did not provide results\n\tforgetful.interceptResults(\"driver\")")
    );
}

#[tokio::test(start_paused = true)]
async fn dev_substitution_outside_dev_version_is_refused() {
    let http = real_http();
    let sink = Arc::new(RecordingSink::default());
    let registry = Arc::new(InMemoryMockRegistry::new());
    let route = Route::new("1.0.0", driver_endpoint()).with_substitution(SubstitutionMode::Dev {
        registry,
        mock_version: "v1".to_string(),
    });

    let response = engine(&http, &sink)
        .with_mocks(support())
        .handle(&route, InboundRequest::get("/driver"))
        .await;

    assert_eq!(response.body, json!({"error": "server", "msg": "server error (2)"}));
}
