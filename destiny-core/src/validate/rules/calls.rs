use std::collections::HashSet;

use serde_json::Value;

use crate::expressions::{
    is_bare_expr, parse_runtime_expr, parse_template, validate_value_expressions, JsonPointer,
};
use crate::types::{EndpointContract, ManifestCall, OutputKind};
use crate::validate::validator::{Validator, ID_RE};

/// Output binding key that targets the whole output (array endpoints).
pub const WHOLE_OUTPUT: &str = ".";

/// Number of `$<n>` placeholders in a dependency target.
pub fn placeholder_count(target: &str) -> usize {
    let bytes = target.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(i, b)| **b == b'$' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
        .count()
}

pub(crate) fn validate_calls(
    v: &mut Validator,
    path: &str,
    calls: &[ManifestCall],
    contract: &EndpointContract,
) {
    let mut seen = HashSet::<&str>::new();
    for (idx, call) in calls.iter().enumerate() {
        let cpath = format!("{path}[{idx}]");

        if call.id.trim().is_empty() {
            v.push(format!("{cpath}.id"), "must not be empty");
        } else if !ID_RE.is_match(&call.id) {
            v.push(format!("{cpath}.id"), "call ids must match [A-Za-z0-9_-.:/]+");
        }
        if !seen.insert(call.id.as_str()) {
            v.push(format!("{cpath}.id"), "duplicate call id");
        }

        validate_target(v, &cpath, call);
        validate_expressions(v, &cpath, call, contract);
        validate_bindings(v, &format!("{cpath}.outputs"), call.outputs.keys(), contract);
        for (field, pointer) in &call.outputs {
            if JsonPointer::parse(pointer).is_err() {
                v.push(
                    format!("{cpath}.outputs.{field}"),
                    "must be a JSON pointer (\"\" or \"/a/b\")",
                );
            }
        }
        if let Some(fallback) = &call.fallback {
            validate_bindings(v, &format!("{cpath}.fallback"), fallback.keys(), contract);
        }
    }
}

fn validate_target(v: &mut Validator, cpath: &str, call: &ManifestCall) {
    let target = call.target.trim();
    if !(target.starts_with("http://") || target.starts_with("https://")) {
        v.push(format!("{cpath}.target"), "must be an http:// or https:// URL");
    }
    let placeholders = placeholder_count(target);
    if placeholders > call.spec.rest_ids.len() {
        v.push(
            format!("{cpath}.restIds"),
            format!(
                "target has {placeholders} rest placeholders but only {} restIds",
                call.spec.rest_ids.len()
            ),
        );
    }
}

fn validate_expressions(v: &mut Validator, cpath: &str, call: &ManifestCall, contract: &EndpointContract) {
    let mut strings: Vec<(String, &str)> = vec![(format!("{cpath}.target"), call.target.as_str())];
    for (i, id) in call.spec.rest_ids.iter().enumerate() {
        strings.push((format!("{cpath}.restIds[{i}]"), id.as_str()));
    }
    for (name, value) in &call.spec.headers {
        if let Some(value) = value {
            strings.push((format!("{cpath}.headers.{name}"), value.as_str()));
        }
    }
    for (p, s) in strings {
        check_string(v, &p, s, contract);
    }

    for (name, value) in &call.spec.params {
        let ppath = format!("{cpath}.params.{name}");
        if let Err(e) = validate_value_expressions(value) {
            v.push(ppath, e.to_string());
            continue;
        }
        if let Value::String(s) = value {
            check_string(v, &ppath, s, contract);
        }
    }
}

fn check_string(v: &mut Validator, path: &str, s: &str, contract: &EndpointContract) {
    let trimmed = s.trim();
    let exprs: Vec<String> = if is_bare_expr(trimmed) {
        vec![trimmed.to_string()]
    } else {
        match parse_template(s) {
            Ok(t) => t.expressions().map(str::to_string).collect(),
            Err(e) => {
                v.push(path, e.to_string());
                return;
            }
        }
    };
    for e in exprs {
        match parse_runtime_expr(&e) {
            Ok(expr) => {
                if let Some(name) = expr.input_name() {
                    if !contract.input.declares(name) {
                        v.push(path, format!("references undeclared input '{name}'"));
                    }
                }
            }
            Err(err) => v.push(path, err.to_string()),
        }
    }
}

fn validate_bindings<'a>(
    v: &mut Validator,
    path: &str,
    fields: impl Iterator<Item = &'a String>,
    contract: &EndpointContract,
) {
    for field in fields {
        match contract.output.kind {
            OutputKind::Array => {
                if field != WHOLE_OUTPUT {
                    v.push(
                        format!("{path}.{field}"),
                        format!("array output only accepts the '{WHOLE_OUTPUT}' binding"),
                    );
                }
            }
            _ => {
                if field == WHOLE_OUTPUT {
                    v.push(
                        format!("{path}.{field}"),
                        "object output binds named fields only",
                    );
                } else if !contract.output.declares(field) {
                    v.push(format!("{path}.{field}"), format!("{field} not allowed in output"));
                }
            }
        }
    }
}
