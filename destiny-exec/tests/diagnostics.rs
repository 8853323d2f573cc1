mod common;

use std::sync::Arc;

use destiny_core::{CallSpec, ClientError, EndpointContract};
use destiny_exec::{diagnose, FnEndpoint, InboundRequest, ScriptError, ScriptSource, ScriptUnit};
use serde_json::json;

use common::{engine, route, FakeHttpClient, RecordingSink, Reply};

const SOURCE: &str = "module.exports = function (ctx) {\n  ctx.request(function (wf) {\n    wf.output('x', data.missing.field);\n  });\n};\n";

#[test]
fn rejection_needs_no_diagnosis() {
    let unit = ScriptUnit::new("race.js", None);
    assert!(diagnose(unit, "request()", ScriptError::Rejected).is_none());
}

#[test]
fn fault_without_frame_reports_unit_and_method() {
    let diagnosis = diagnose(
        ScriptUnit::new("race.js", None),
        "results(\"race\")",
        ScriptError::new("cannot read name"),
    )
    .unwrap();

    assert_eq!(diagnosis.error, ClientError::server("server error"));
    assert_eq!(
        diagnosis.event_meta,
        json!({"trace": "cannot read name\n\trace.js.results(\"race\")"})
    );
}

#[test]
fn traced_fault_without_frame_is_a_framework_error() {
    let source = ScriptSource::new("race.js", SOURCE);
    let err = ScriptError::new("boom").with_trace(["at internal::frame (lib.rs:1:1)"]);

    let diagnosis = diagnose(ScriptUnit::new("race.js", Some(&source)), "request()", err).unwrap();

    assert_eq!(diagnosis.error, ClientError::server("server framework error"));
    assert_eq!(
        diagnosis.event_meta,
        json!({"trace": ["boom", "at internal::frame (lib.rs:1:1)"]})
    );
}

#[test]
fn fault_with_frame_quotes_the_failing_line() {
    let source = ScriptSource::new("race.js", SOURCE);
    let err = ScriptError::new("data is not defined").at("race.js", 3, 20);

    let diagnosis = diagnose(ScriptUnit::new("race.js", Some(&source)), "request()", err).unwrap();

    assert_eq!(diagnosis.error.msg, "server error");
    assert_eq!(
        diagnosis.event_meta["trace"],
        json!("data is not defined\n\tat wf.output('x', data.missing.field); (race.js:3:20)\n\trace.js.request()")
    );
}

#[test]
fn frame_outside_the_source_is_a_framework_error() {
    let source = ScriptSource::new("race.js", SOURCE);
    let err = ScriptError::new("stack overflow")
        .at("engine.js", 400, 1)
        .with_trace(["at dispatch (engine.js:400:1)", "at run (engine.js:12:3)"]);

    let diagnosis = diagnose(ScriptUnit::new("race.js", Some(&source)), "request()", err).unwrap();

    assert_eq!(diagnosis.error.msg, "server framework error");
    assert_eq!(
        diagnosis.event_meta["trace"],
        json!([
            "stack overflow",
            "at dispatch (engine.js:400:1)",
            "at run (engine.js:12:3)"
        ])
    );
}

#[test]
fn blank_lines_are_not_quoted() {
    let source = ScriptSource::new("race.js", "a\n\n  b  \n");
    assert_eq!(source.line(1), Some("a"));
    assert_eq!(source.line(2), None);
    assert_eq!(source.line(3), Some("b"));
    assert_eq!(source.line(0), None);
    assert_eq!(source.line(9), None);
}

#[tokio::test(start_paused = true)]
async fn handler_fault_renders_a_server_error_and_logs_the_trace() {
    let http = Arc::new(
        FakeHttpClient::new().route("http://races.test/", Reply::json(200, json!({"name": "spa"}))),
    );
    let sink = Arc::new(RecordingSink::default());
    let endpoint = FnEndpoint::new("race.js", EndpointContract::default(), |ctx| {
        ctx.request(|_ctx, wf| wf.call_as("race", "http://races.test/r", CallSpec::get()))?;
        ctx.results("race", |_ctx, _wf, _status, _body| {
            Err(ScriptError::new("data is not defined").at("race.js", 3, 20))
        })
    })
    .with_source(ScriptSource::new("race.js", SOURCE));

    let response = engine(&http, &sink)
        .handle(&route(endpoint), InboundRequest::get("/race"))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body, json!({"error": "server", "msg": "server error"}));

    let event = sink.find("Server Error").expect("diagnostic event");
    assert_eq!(
        event.meta["trace"],
        json!("data is not defined\n\tat wf.output('x', data.missing.field); (race.js:3:20)\n\trace.js.results(\"race\")")
    );
    assert_eq!(sink.messages(), vec!["Server Error".to_string(), "Server error".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn frameless_results_fault_keeps_its_raw_trace() {
    let http = Arc::new(
        FakeHttpClient::new().route("http://races.test/", Reply::json(200, json!({"name": "spa"}))),
    );
    let sink = Arc::new(RecordingSink::default());
    let endpoint = FnEndpoint::new("race.js", EndpointContract::default(), |ctx| {
        ctx.request(|_ctx, wf| wf.call_as("race", "http://races.test/r", CallSpec::get()))?;
        ctx.results("race", |_ctx, _wf, _status, _body| {
            Err(ScriptError::new("index out of bounds")
                .with_trace(["at decode (codec.rs:88:9)", "at settle (engine.rs:12:3)"]))
        })
    })
    .with_source(ScriptSource::new("race.js", SOURCE));

    let response = engine(&http, &sink)
        .handle(&route(endpoint), InboundRequest::get("/race"))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(
        response.body,
        json!({"error": "server", "msg": "server framework error"})
    );
    let event = sink.find("Server Error").expect("diagnostic event");
    assert_eq!(
        event.meta["trace"],
        json!([
            "index out of bounds",
            "at decode (codec.rs:88:9)",
            "at settle (engine.rs:12:3)"
        ])
    );
}
