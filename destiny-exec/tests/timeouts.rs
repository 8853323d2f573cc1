mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use destiny_core::{CallSpec, EndpointContract, FieldType, InputContract, OutputContract};
use destiny_exec::{FnEndpoint, InboundRequest};
use serde_json::json;

use common::{engine, route, FakeHttpClient, RecordingSink, Reply};

fn contract() -> EndpointContract {
    EndpointContract::new(
        InputContract::default(),
        OutputContract::object()
            .optional("slow", FieldType::String)
            .optional("fast", FieldType::String),
    )
}

fn http() -> Arc<FakeHttpClient> {
    Arc::new(
        FakeHttpClient::new()
            .route("http://slow.test/", Reply::json(200, json!({"v": "slow"})).after(100))
            .route("http://fast.test/", Reply::json(200, json!({"v": "fast"})).after(5)),
    )
}

#[tokio::test(start_paused = true)]
async fn timed_out_call_renders_timeout_and_late_success_changes_nothing() {
    let http = http();
    let sink = Arc::new(RecordingSink::default());
    let late = Arc::new(AtomicBool::new(false));

    let flag = late.clone();
    let endpoint = FnEndpoint::new("race.js", contract(), move |ctx| {
        ctx.request(|_ctx, wf| {
            wf.call("http://slow.test/v", CallSpec::get().timeout_ms(50))?;
            wf.call("http://fast.test/v", CallSpec::get())
        })?;
        let flag = flag.clone();
        ctx.results("http://slow.test/v", move |_ctx, wf, _status, body| {
            flag.store(true, Ordering::SeqCst);
            wf.output("slow", body["v"].clone())
        })?;
        ctx.results("http://fast.test/v", |_ctx, wf, _status, body| {
            wf.output("fast", body["v"].clone())
        })
    });

    let started = tokio::time::Instant::now();
    let response = engine(&http, &sink)
        .handle(&route(endpoint), InboundRequest::get("/race"))
        .await;
    assert!(started.elapsed() < Duration::from_millis(100));

    // Let the abandoned delivery run out; it must not reach the results handler.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body, json!({"error": "timeout", "msg": "request timed out"}));
    assert!(!late.load(Ordering::SeqCst));

    let event = sink.find("Dependpoint timed out").expect("timeout event");
    assert_eq!(event.meta["dependTimeout"], json!(50));
    assert_eq!(event.meta["dependUrl"], json!("http://slow.test/v"));
}

#[tokio::test(start_paused = true)]
async fn allow_timeout_keeps_the_request_alive() {
    let http = http();
    let sink = Arc::new(RecordingSink::default());
    let endpoint = FnEndpoint::new("race.js", contract(), |ctx| {
        ctx.request(|_ctx, wf| {
            wf.call("http://slow.test/v", CallSpec::get().timeout_ms(50).allow_timeout())?;
            wf.call("http://fast.test/v", CallSpec::get())
        })?;
        ctx.results("http://slow.test/v", |_ctx, wf, _status, body| {
            wf.output("slow", body["v"].clone())
        })?;
        ctx.results("http://fast.test/v", |_ctx, wf, _status, body| {
            wf.output("fast", body["v"].clone())
        })
    });

    let response = engine(&http, &sink)
        .handle(&route(endpoint), InboundRequest::get("/race"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"fast": "fast"}));
    assert!(sink.find("Dependpoint timed out").is_some());
}

#[tokio::test(start_paused = true)]
async fn exception_handler_sees_the_timeout() {
    let http = http();
    let sink = Arc::new(RecordingSink::default());
    let endpoint = FnEndpoint::new("race.js", contract(), |ctx| {
        ctx.request(|_ctx, wf| wf.call("http://slow.test/v", CallSpec::get().timeout_ms(20)))?;
        ctx.results("http://slow.test/v", |_ctx, wf, _status, body| {
            wf.output("slow", body["v"].clone())
        })?;
        ctx.exception("http://slow.test/v", |_ctx, wf, status, body| {
            assert!(status.timed_out);
            assert_eq!(status.code, 0);
            assert!(body.is_null());
            wf.output("slow", "cached")
        })
    });

    let response = engine(&http, &sink)
        .handle(&route(endpoint), InboundRequest::get("/race"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"slow": "cached"}));
}

#[tokio::test(start_paused = true)]
async fn call_within_deadline_is_not_timed_out() {
    let http = http();
    let sink = Arc::new(RecordingSink::default());
    let endpoint = FnEndpoint::new("race.js", contract(), |ctx| {
        ctx.request(|_ctx, wf| wf.call("http://slow.test/v", CallSpec::get().timeout_ms(150)))?;
        ctx.results("http://slow.test/v", |_ctx, wf, _status, body| {
            wf.output("slow", body["v"].clone())
        })
    });

    let response = engine(&http, &sink)
        .handle(&route(endpoint), InboundRequest::get("/race"))
        .await;

    assert_eq!(response.body, json!({"slow": "slow"}));
    assert!(sink.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn results_handler_can_chain_a_dependent_call() {
    let http = Arc::new(
        FakeHttpClient::new()
            .route("http://users.test/", Reply::json(200, json!({"teamId": 12})).after(10))
            .route("http://teams.test/", Reply::json(200, json!({"name": "red"})).after(10)),
    );
    let sink = Arc::new(RecordingSink::default());
    let endpoint = FnEndpoint::new(
        "chain.js",
        EndpointContract::new(
            InputContract::default(),
            OutputContract::object().required("team", FieldType::String),
        ),
        |ctx| {
            ctx.request(|_ctx, wf| wf.call_as("user", "http://users.test/u", CallSpec::get()))?;
            ctx.results("user", |_ctx, wf, _status, body| {
                let team = body["teamId"].to_string();
                wf.call_as("team", "http://teams.test/t/$0", CallSpec::get().rest_ids([team]))
            })?;
            ctx.results("team", |_ctx, wf, _status, body| wf.output("team", body["name"].clone()))
        },
    );

    let response = engine(&http, &sink)
        .handle(&route(endpoint), InboundRequest::get("/c"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"team": "red"}));
    assert_eq!(
        http.urls(),
        vec!["http://users.test/u".to_string(), "http://teams.test/t/12".to_string()]
    );
}
