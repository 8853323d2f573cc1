use std::collections::BTreeMap;

use destiny_core::expressions::value_text;
use destiny_core::{BodyEncoding, CallSpec, ClientError, HeaderParameter, ParamMap};
use serde_json::Value;

use super::http::HttpRequestParts;
use crate::workflow::ResponseHeaders;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestIdError {
    /// `$<index>` expected at the next placeholder but something else was found.
    #[error("Invalid dependency URI with rest parameter in {path} {index} restIds: {rest_ids:?}")]
    Gap {
        path: String,
        index: usize,
        rest_ids: Vec<String>,
    },
    #[error("No rest id for index {index} in {path}")]
    Missing { path: String, index: usize },
}

impl RestIdError {
    pub fn to_client_error(&self) -> ClientError {
        match self {
            RestIdError::Gap { .. } => ClientError::server("Invalid dependency URI with rest parameter"),
            RestIdError::Missing { index, .. } => ClientError::server(format!("No rest id for index {index}")),
        }
    }
}

/// Replace `$0`, `$1`, ... in the path of `target` with `rest_ids`, strictly in order.
pub fn substitute_rest_ids(target: &str, rest_ids: &[String]) -> Result<String, RestIdError> {
    let path_start = target
        .find("://")
        .map(|i| i + 3)
        .and_then(|host_start| target[host_start..].find('/').map(|i| host_start + i))
        .unwrap_or(target.len());
    let (head, path) = target.split_at(path_start);

    let mut out = String::with_capacity(target.len());
    out.push_str(head);

    let mut rest = path;
    let mut index = 0usize;
    while let Some(pos) = rest.find('$') {
        let marker = index.to_string();
        if !rest[pos + 1..].starts_with(&marker) {
            return Err(RestIdError::Gap {
                path: path.to_string(),
                index,
                rest_ids: rest_ids.to_vec(),
            });
        }
        let Some(id) = rest_ids.get(index) else {
            return Err(RestIdError::Missing {
                path: path.to_string(),
                index,
            });
        };
        out.push_str(&rest[..pos]);
        out.push_str(id);
        rest = &rest[pos + 1 + marker.len()..];
        index += 1;
    }
    out.push_str(rest);
    Ok(out)
}

/// Query-string form of `params`, in insertion order.
///
/// Arrays repeat the key, `null` yields an empty value and objects are sent empty.
pub fn encode_params(params: &ParamMap) -> String {
    let mut pairs = Vec::with_capacity(params.len());
    for (k, v) in params {
        let key = urlencoding::encode(k);
        match v {
            Value::Array(items) => {
                for item in items {
                    pairs.push(format!("{key}={}", urlencoding::encode(&scalar_text(item))));
                }
            }
            other => pairs.push(format!("{key}={}", urlencoding::encode(&scalar_text(other)))),
        }
    }
    pairs.join("&")
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::Object(_) | Value::Array(_) => String::new(),
        other => value_text(other),
    }
}

/// Header parameters flagged for forwarding, overlaid by the call's own overrides.
pub fn outbound_headers(
    params: &[HeaderParameter],
    generated: &ResponseHeaders,
    overrides: &BTreeMap<String, Option<String>>,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for hp in params.iter().filter(|hp| hp.forward_to_depends) {
        if let Some(v) = generated.get(&hp.name) {
            headers.insert(hp.name.clone(), v.to_string());
        }
    }
    for (name, value) in overrides {
        match value {
            Some(v) => {
                headers.insert(name.clone(), v.clone());
            }
            None => {
                headers.remove(name);
            }
        }
    }
    headers
}

/// Build the wire request for an already substituted `target`.
pub fn build_request(
    target: &str,
    spec: &CallSpec,
    mut headers: BTreeMap<String, String>,
) -> Result<HttpRequestParts, ClientError> {
    let mut url = url::Url::parse(target)
        .map_err(|e| ClientError::server(format!("invalid dependency URI {target}: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClientError::server(format!(
                "unsupported dependency scheme: {other}"
            )))
        }
    }

    let method = spec.method().to_ascii_uppercase();
    let body = if spec.is_post() {
        let body = match spec.body_encoding {
            BodyEncoding::Json => serde_json::to_vec(&spec.params)
                .map_err(|e| ClientError::server(format!("failed to encode request body: {e}")))?,
            BodyEncoding::Form => encode_params(&spec.params).into_bytes(),
        };
        headers.insert("Content-Type".to_string(), spec.body_encoding.content_type().to_string());
        headers.insert("Content-Length".to_string(), body.len().to_string());
        body
    } else {
        let query = encode_params(&spec.params);
        if !query.is_empty() {
            let merged = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
                _ => query,
            };
            url.set_query(Some(&merged));
        }
        Vec::new()
    };

    Ok(HttpRequestParts {
        method,
        url,
        headers,
        body,
    })
}
