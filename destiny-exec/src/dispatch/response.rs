use serde_json::Value;

use super::http::HttpResponseParts;

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Body as JSON when asked for and parseable, otherwise the raw text.
pub fn parse_body(resp: &HttpResponseParts, expects_json: bool) -> Value {
    if expects_json {
        if let Ok(v) = serde_json::from_slice::<Value>(&resp.body) {
            return v;
        }
    }
    Value::String(String::from_utf8_lossy(&resp.body).into_owned())
}
