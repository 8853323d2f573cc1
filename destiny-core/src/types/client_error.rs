use std::fmt;

use serde::{Deserialize, Serialize};

/// The `error` field of an error payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorKind {
    /// Malformed or missing parameter, or malformed output field.
    Input,
    /// Contract violation, mis-declared endpoint or uncaught script fault.
    Server,
    /// Same family as `Server`; kept distinct because clients match on it.
    ServerError,
    /// A dependency deadline elapsed and nothing absorbed it.
    Timeout,
    /// A dependency call failed and nothing absorbed it.
    Error,
    /// Endpoint-chosen kind, e.g. `not_found`.
    Custom(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::Input => "input",
            ErrorKind::Server => "server",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Error => "error",
            ErrorKind::Custom(s) => s.as_str(),
        }
    }
}

impl From<String> for ErrorKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "input" => ErrorKind::Input,
            "server" => ErrorKind::Server,
            "server_error" => ErrorKind::ServerError,
            "timeout" => ErrorKind::Timeout,
            "error" => ErrorKind::Error,
            _ => ErrorKind::Custom(s),
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(s: &str) -> Self {
        ErrorKind::from(s.to_string())
    }
}

impl From<ErrorKind> for String {
    fn from(k: ErrorKind) -> Self {
        k.as_str().to_string()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload rendered to the caller as `{error, msg}`.
///
/// `code` selects the HTTP status and is never part of the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{error}: {msg}")]
pub struct ClientError {
    pub error: ErrorKind,
    pub msg: String,
    #[serde(default, skip_serializing)]
    pub code: Option<u16>,
    #[serde(flatten, default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClientError {
    pub const DEFAULT_STATUS: u16 = 500;

    pub fn new(error: impl Into<ErrorKind>, msg: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            msg: msg.into(),
            code: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, msg)
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, msg)
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn status(&self) -> u16 {
        self.code.unwrap_or(Self::DEFAULT_STATUS)
    }

    pub fn to_body(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "error": self.error.as_str(), "msg": self.msg })
        })
    }
}
