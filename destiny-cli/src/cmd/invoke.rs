use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use destiny_core::{DocumentFormat, TestConfig};
use destiny_exec::{
    Engine, EngineConfig, HttpLogSink, InboundRequest, ManifestEndpoint, ManifestError, NoOpHttpLogSink,
    Route, StdoutHttpLogSink, SubstitutionMode, TracingHttpLogSink,
};
use serde::Serialize;
use serde_json::Value;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{MockArgs, OutputArgs, RequestArgs, StoreArgs};

use super::config::{connect_store, load_document, parse_pairs, read_file, MocksFile};

#[derive(Serialize)]
struct InvokeResult {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Value,
}

pub async fn invoke_cmd(
    path: &Path,
    request: RequestArgs,
    config_path: Option<&Path>,
    http_log: &str,
    mocks: MockArgs,
    output: OutputArgs,
    store: StoreArgs,
) -> i32 {
    let Some(content) = read_file(path, &output) else {
        return exit_codes::RUNTIME_ERROR;
    };
    let endpoint = match ManifestEndpoint::parse(&content, DocumentFormat::Auto) {
        Ok(endpoint) => endpoint,
        Err(ManifestError::Validation(err)) => {
            print_error(output.format, output.quiet, "manifest validation failed");
            if !output.quiet {
                for v in &err.violations {
                    eprintln!("- {v}");
                }
            }
            return exit_codes::VALIDATION_FAILED;
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let config = match config_path {
        Some(p) => match load_document::<EngineConfig>(p, "engine config", &output) {
            Some(c) => c,
            None => return exit_codes::RUNTIME_ERROR,
        },
        None => EngineConfig::default(),
    };

    let sink: Arc<dyn HttpLogSink> = match http_log {
        "tracing" => Arc::new(TracingHttpLogSink),
        "stdout" => Arc::new(StdoutHttpLogSink),
        "none" => Arc::new(NoOpHttpLogSink),
        other => {
            print_error(
                output.format,
                output.quiet,
                &format!("unknown http-log sink: {other}"),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let mut engine = Engine::new(config).with_http_log(sink);

    if let Some(database_url) = &store.store {
        match connect_store(database_url, &store, &output).await {
            Some(pg) => engine = engine.with_cache(Arc::new(pg)),
            None => return exit_codes::RUNTIME_ERROR,
        }
    }

    let mut substitution = SubstitutionMode::Off;
    if let Some(p) = &mocks.mocks {
        match load_document::<MocksFile>(p, "mocks file", &output) {
            Some(file) => engine = engine.with_mocks(file.into_support()),
            None => return exit_codes::RUNTIME_ERROR,
        }
    }
    if let Some(p) = &mocks.test_config {
        match load_document::<TestConfig>(p, "test config", &output) {
            Some(test) => substitution = SubstitutionMode::Test(test),
            None => return exit_codes::RUNTIME_ERROR,
        }
    }

    let Some(inbound) = build_inbound(&request, &output) else {
        return exit_codes::RUNTIME_ERROR;
    };
    let route = Route::new(request.api_version.clone(), Arc::new(endpoint)).with_substitution(substitution);

    let response = engine.handle(&route, inbound).await;
    engine.flush_cache_writes().await;
    tracing::debug!(target: "destiny", status = response.status, "request rendered");

    let ok = response.is_success();
    let result = InvokeResult {
        status: response.status,
        headers: response.headers,
        body: response.body,
    };
    if output.format == OutputFormat::Text && !output.quiet {
        println!("HTTP {}", result.status);
        for (name, value) in &result.headers {
            println!("{name}: {value}");
        }
        println!();
        print_result(output.format, output.quiet, &result.body);
    } else {
        print_result(output.format, output.quiet, &result);
    }

    if ok {
        exit_codes::SUCCESS
    } else {
        exit_codes::REQUEST_FAILED
    }
}

fn build_inbound(request: &RequestArgs, output: &OutputArgs) -> Option<InboundRequest> {
    let mut inbound = InboundRequest::get(request.path.clone()).id_path(request.id_path.iter().cloned());
    for (name, value) in parse_pairs(&request.params, output)? {
        inbound = inbound.param(name, value);
    }
    for (name, value) in parse_pairs(&request.headers, output)? {
        inbound = inbound.header(name, value);
    }
    if let Some(ip) = &request.remote_ip {
        inbound = inbound.remote_ip(ip.clone());
    }
    Some(inbound)
}
