use std::sync::Arc;
use std::time::Duration;

use destiny_core::{CallSpec, ClientError};
use serde_json::Value;

use super::http::{HttpClient, HttpRequestParts};
use super::response::{is_success, parse_body};
use crate::context::{CallStatus, MockContext};
use crate::error::{ScriptError, ScriptSource};
use crate::mock::{resolve, MockDescriptor, MockSupport, Resolved, Rewrite, SubstitutionMode};
use crate::workflow::{CallId, Substitution};

/// A dependency call ready to go out.
#[derive(Debug, Clone)]
pub(crate) struct CallJob {
    pub id: CallId,
    pub ticket: u64,
    /// Target as written by the endpoint; mocks are keyed on it.
    pub target: String,
    pub spec: CallSpec,
    pub request: HttpRequestParts,
}

/// What every call of one invocation shares.
pub(crate) struct CallEnv {
    pub http: Arc<dyn HttpClient>,
    pub max_response_bytes: usize,
    pub mode: SubstitutionMode,
    pub support: Option<MockSupport>,
    pub api_version: String,
    pub mock_ctx: MockContext,
}

#[derive(Debug)]
pub(crate) enum Outcome {
    Delivered { status: CallStatus, body: Value },
    Transport { error: String },
    TimedOut,
    /// Resolution failed before anything was sent.
    Rejected(ClientError),
    ScriptFault {
        unit: String,
        source: Option<ScriptSource>,
        method: String,
        error: ScriptError,
    },
}

#[derive(Debug)]
pub(crate) struct Settlement {
    pub id: CallId,
    pub ticket: u64,
    pub spec: CallSpec,
    pub depend_url: String,
    pub substitution: Option<Substitution>,
    pub outcome: Outcome,
}

/// Resolve substitution, then deliver within the call's deadline.
pub(crate) async fn dispatch(job: CallJob, env: Arc<CallEnv>) -> Settlement {
    let resolved = match resolve(&env.mode, env.support.as_ref(), &env.api_version, &job.target).await {
        Ok(r) => r,
        Err(e) => {
            return Settlement {
                depend_url: job.request.url.to_string(),
                id: job.id,
                ticket: job.ticket,
                spec: job.spec,
                substitution: None,
                outcome: Outcome::Rejected(e),
            }
        }
    };

    let substitution = resolved.substitution();
    let depend_url = if resolved.mock.is_some() {
        format!("[mock] {}", job.request.url)
    } else {
        job.request.url.to_string()
    };

    let delivery = deliver(&job, &env, resolved);
    let outcome = match job.spec.deadline() {
        Some(deadline) => tokio::time::timeout(deadline, delivery)
            .await
            .unwrap_or(Outcome::TimedOut),
        None => delivery.await,
    };

    Settlement {
        id: job.id,
        ticket: job.ticket,
        spec: job.spec,
        depend_url,
        substitution,
        outcome,
    }
}

async fn deliver(job: &CallJob, env: &CallEnv, resolved: Resolved) -> Outcome {
    if let Some((name, mock, selection)) = resolved.mock {
        let body = match mock {
            MockDescriptor::Static(value) => value,
            MockDescriptor::Script(script) => {
                match script.get_results(&env.mock_ctx, &job.spec.params, selection.status_code) {
                    Ok(value) => value,
                    Err(error) => {
                        return Outcome::ScriptFault {
                            unit: name,
                            source: script.source().cloned(),
                            method: format!("getResults(\"{}\")", job.id),
                            error,
                        }
                    }
                }
            }
        };
        tracing::debug!(target: "destiny", "mocking {} with {name}", job.target);
        tokio::time::sleep(Duration::from_millis(selection.latency)).await;
        return Outcome::Delivered {
            status: CallStatus::with_code(selection.status_code),
            body,
        };
    }

    tracing::debug!(target: "destiny", "calling {} {}", job.request.method, job.request.url);
    let resp = match env.http.send(job.request.clone(), env.max_response_bytes).await {
        Ok(resp) => resp,
        Err(e) => return Outcome::Transport { error: e.to_string() },
    };
    let body = parse_body(&resp, job.spec.expects_json());
    let status = CallStatus {
        code: resp.status,
        headers: resp.headers,
        ..CallStatus::default()
    };

    let Some((name, script, selection)) = resolved.interceptor.filter(|_| is_success(status.code)) else {
        return Outcome::Delivered { status, body };
    };

    tokio::time::sleep(Duration::from_millis(selection.latency)).await;
    let method = format!("interceptResults(\"{}\")", job.id);
    let mut rewrite = Rewrite::default();
    if let Err(error) = script.intercept_results(&env.mock_ctx, &job.spec.params, &status, body, &mut rewrite) {
        return Outcome::ScriptFault {
            unit: name,
            source: script.source().cloned(),
            method,
            error,
        };
    }
    let Some(body) = rewrite.into_results() else {
        return Outcome::ScriptFault {
            unit: name,
            source: script.source().cloned(),
            method,
            error: ScriptError::new("interceptor did not provide results"),
        };
    };
    tracing::debug!(target: "destiny", "intercepted {} with {name}", job.target);
    Outcome::Delivered {
        status: CallStatus {
            code: selection.status_code,
            ..status
        },
        body,
    }
}
