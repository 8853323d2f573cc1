mod common;

use std::sync::Arc;

use destiny_core::DocumentFormat;
use destiny_exec::{Endpoint, InboundRequest, ManifestEndpoint, ManifestError, Route};
use serde_json::json;

use common::{engine, FakeHttpClient, RecordingSink, Reply};

const RACE_MANIFEST: &str = r#"
name: race.yaml
input:
  required:
    raceId: { type: number }
  optional:
    lang: { type: string }
output:
  type: object
  required:
    title: { type: string }
    winner: { type: string }
  optional:
    weather: { type: object }
calls:
  - id: race
    target: "http://races.test/race/$0"
    restIds: ["{$input.raceId}"]
    params:
      lang: "$input.lang"
    headers:
      X-Trace: "race-{$header.x-trace}"
    outputs:
      title: /name
      winner: /result/0/driver
  - id: weather
    target: "http://weather.test/at"
    params:
      race: "$input.raceId"
      track: "{$idPath.0}"
    timeout: 50
    outputs:
      weather: ""
    fallback:
      weather: { sky: unknown }
"#;

fn route_for(raw: &str) -> Route {
    let endpoint = ManifestEndpoint::parse(raw, DocumentFormat::Auto).expect("valid manifest");
    Route::new("1.0.0", Arc::new(endpoint))
}

#[tokio::test(start_paused = true)]
async fn manifest_fans_out_and_maps_outputs() {
    let http = Arc::new(
        FakeHttpClient::new()
            .route(
                "http://races.test/",
                Reply::json(200, json!({"name": "Monza GP", "result": [{"driver": "leclerc"}]})),
            )
            .route("http://weather.test/", Reply::json(200, json!({"sky": "clear"}))),
    );
    let sink = Arc::new(RecordingSink::default());

    let response = engine(&http, &sink)
        .handle(
            &route_for(RACE_MANIFEST),
            InboundRequest::get("/api/1.0.0/race")
                .param("raceId", "16")
                .param("lang", "it")
                .header("X-Trace", "abc")
                .id_path(["monza"]),
        )
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        json!({"title": "Monza GP", "winner": "leclerc", "weather": {"sky": "clear"}})
    );

    let requests = http.requests();
    let race = requests
        .iter()
        .find(|r| r.url.host_str() == Some("races.test"))
        .unwrap();
    assert_eq!(race.url.as_str(), "http://races.test/race/16?lang=it");
    assert_eq!(race.headers.get("X-Trace").map(String::as_str), Some("race-abc"));

    let weather = requests
        .iter()
        .find(|r| r.url.host_str() == Some("weather.test"))
        .unwrap();
    assert_eq!(weather.url.as_str(), "http://weather.test/at?race=16&track=monza");
}

#[tokio::test(start_paused = true)]
async fn fallback_absorbs_a_timed_out_call() {
    let http = Arc::new(
        FakeHttpClient::new()
            .route(
                "http://races.test/",
                Reply::json(200, json!({"name": "Spa GP", "result": [{"driver": "verstappen"}]})),
            )
            .route("http://weather.test/", Reply::json(200, json!({"sky": "rain"})).after(500)),
    );
    let sink = Arc::new(RecordingSink::default());

    let response = engine(&http, &sink)
        .handle(
            &route_for(RACE_MANIFEST),
            InboundRequest::get("/api/1.0.0/race").param("raceId", 13).id_path(["spa"]),
        )
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        json!({"title": "Spa GP", "winner": "verstappen", "weather": {"sky": "unknown"}})
    );
    assert!(sink.find("Dependpoint timed out").is_some());
}

#[tokio::test(start_paused = true)]
async fn missing_pointer_target_leaves_required_output_unset() {
    let http = Arc::new(
        FakeHttpClient::new()
            .route("http://races.test/", Reply::json(200, json!({"name": "Imola GP"})))
            .route("http://weather.test/", Reply::json(200, json!({"sky": "clear"}))),
    );
    let sink = Arc::new(RecordingSink::default());

    let response = engine(&http, &sink)
        .handle(
            &route_for(RACE_MANIFEST),
            InboundRequest::get("/api/1.0.0/race").param("raceId", 7),
        )
        .await;

    assert_eq!(
        response.body,
        json!({"error": "server", "msg": "required output missing: winner"})
    );
}

#[tokio::test(start_paused = true)]
async fn array_manifest_binds_the_whole_output() {
    let raw = r#"{
        "name": "standings.json",
        "output": { "type": "array" },
        "calls": [
            { "id": "standings", "target": "https://standings.test/all", "outputs": { ".": "/rows" } }
        ]
    }"#;
    let http = Arc::new(FakeHttpClient::new().route(
        "https://standings.test/",
        Reply::json(200, json!({"rows": [{"pos": 1}, {"pos": 2}]})),
    ));
    let sink = Arc::new(RecordingSink::default());

    let response = engine(&http, &sink)
        .handle(&route_for(raw), InboundRequest::get("/standings"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!([{"pos": 1}, {"pos": 2}]));
}

#[test]
fn invalid_manifest_is_rejected_with_violations() {
    let raw = r#"
name: broken.yaml
output:
  required:
    title: { type: string }
calls:
  - id: race
    target: "ftp://races.test/$0"
    outputs:
      headline: /name
"#;
    let err = ManifestEndpoint::parse(raw, DocumentFormat::Yaml).unwrap_err();
    let ManifestError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let paths: Vec<&str> = validation.violations.iter().map(|v| v.path.as_str()).collect();
    assert!(paths.contains(&"$.calls[0].target"));
    assert!(paths.contains(&"$.calls[0].restIds"));
    assert!(paths.contains(&"$.calls[0].outputs.headline"));
}

#[test]
fn unparseable_manifest_is_a_parse_error() {
    let err = ManifestEndpoint::parse("{ not: [valid", DocumentFormat::Json).unwrap_err();
    assert!(matches!(err, ManifestError::Parse(_)));
}

#[test]
fn manifest_endpoint_exposes_contract_and_config() {
    let endpoint = ManifestEndpoint::parse(RACE_MANIFEST, DocumentFormat::Yaml).unwrap();
    assert_eq!(endpoint.name(), "race.yaml");
    assert!(endpoint.contract().input.declares("raceId"));
    assert!(endpoint.config().middleware.is_empty());
    assert_eq!(endpoint.manifest().calls.len(), 2);
}
