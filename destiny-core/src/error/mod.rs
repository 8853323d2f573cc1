use std::fmt;

use thiserror::Error;

/// A manifest, engine config, test config or mock file that could not be decoded.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("not a valid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not a valid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("document is neither valid JSON nor valid YAML")]
    UnknownFormat,
}

/// Every rule a manifest broke, in discovery order.
#[derive(Debug, Error)]
#[error("endpoint manifest is invalid: {}", summary(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

fn summary(violations: &[Violation]) -> String {
    match violations {
        [] => "no violations".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// One broken rule, located by a `$.calls[0].target` style path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
