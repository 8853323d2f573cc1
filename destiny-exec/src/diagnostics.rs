use destiny_core::ClientError;
use serde_json::{json, Value};

use crate::error::{ScriptError, ScriptSource};

pub const SERVER_ERROR_MSG: &str = "server error";
pub const FRAMEWORK_ERROR_MSG: &str = "server framework error";

/// The unit of endpoint code a handler belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ScriptUnit<'a> {
    pub name: &'a str,
    pub source: Option<&'a ScriptSource>,
}

impl<'a> ScriptUnit<'a> {
    pub fn new(name: &'a str, source: Option<&'a ScriptSource>) -> Self {
        Self { name, source }
    }
}

/// What the caller reports for a failed invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub error: ClientError,
    /// Meta of the "Server Error" http-log event.
    pub event_meta: Value,
}

/// Convert a script failure into a client error plus log output.
///
/// Returns `None` for [`ScriptError::Rejected`], whose error is already on the workflow.
pub fn diagnose(unit: ScriptUnit<'_>, method: &str, err: ScriptError) -> Option<Diagnosis> {
    let ScriptError::Fault {
        message,
        frame,
        trace,
    } = err
    else {
        return None;
    };

    // Raised by the unit itself with nothing more precise than the method.
    let raised_by_unit = frame.is_none() && trace.is_empty();
    let line = frame
        .as_ref()
        .and_then(|frame| unit.source.and_then(|s| s.line(frame.line)));
    let (Some(frame), Some(line)) = (frame, line) else {
        if raised_by_unit {
            tracing::error!(target: "destiny", "{message}");
            tracing::error!(target: "destiny", "\tin {}.{method}", unit.name);
            return Some(Diagnosis {
                error: ClientError::server(SERVER_ERROR_MSG),
                event_meta: json!({ "trace": format!("{message}\n\t{}.{method}", unit.name) }),
            });
        }
        return Some(framework_fault(unit, method, message, trace));
    };

    let location = format!("({frame})");
    tracing::error!(target: "destiny", "{message}");
    tracing::error!(target: "destiny", "\tat {line} {location}");
    tracing::error!(target: "destiny", "\tin {}.{method}", unit.name);

    Some(Diagnosis {
        error: ClientError::server(SERVER_ERROR_MSG),
        event_meta: json!({
            "trace": format!("{message}\n\tat {line} {location}\n\t{}.{method}", unit.name)
        }),
    })
}

/// A fault that cannot be attributed to a line of the unit's source.
fn framework_fault(unit: ScriptUnit<'_>, method: &str, message: String, trace: Vec<String>) -> Diagnosis {
    let mut full = Vec::with_capacity(trace.len() + 1);
    full.push(message);
    full.extend(trace);
    for entry in &full {
        tracing::error!(target: "destiny", "{entry}");
    }
    tracing::error!(target: "destiny", "\tin {}.{method}", unit.name);
    Diagnosis {
        error: ClientError::server(FRAMEWORK_ERROR_MSG),
        event_meta: json!({ "trace": full }),
    }
}
