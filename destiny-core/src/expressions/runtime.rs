use std::sync::LazyLock;

use regex::Regex;

use super::json_pointer::{JsonPointer, JsonPointerError};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\.\-_]+$").expect("valid regex"));

static TCHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeExpr {
    /// `$input.<name>[#<pointer>]`: a cast request parameter.
    Input {
        name: String,
        pointer: Option<JsonPointer>,
    },
    /// `$idPath.<n>`: the n-th restful id of the inbound path.
    IdPath(usize),
    /// `$idMap.<name>`: a named restful id.
    IdMap(String),
    /// `$header.<name>`: a synthesized header parameter.
    Header(String),
}

impl RuntimeExpr {
    pub fn input_name(&self) -> Option<&str> {
        match self {
            RuntimeExpr::Input { name, .. } => Some(name),
            _ => None,
        }
    }
}

pub fn parse_runtime_expr(input: &str) -> Result<RuntimeExpr, RuntimeExprError> {
    let s = input.trim();
    let Some(body) = s.strip_prefix('$') else {
        return Err(RuntimeExprError::MissingDollarPrefix);
    };

    let (head, pointer) = match body.split_once('#') {
        Some((head, frag)) => (
            head,
            Some(JsonPointer::parse(frag).map_err(RuntimeExprError::InvalidJsonPointer)?),
        ),
        None => (body, None),
    };

    if let Some(name) = head.strip_prefix("input.") {
        check_name(name)?;
        return Ok(RuntimeExpr::Input {
            name: name.to_string(),
            pointer,
        });
    }

    if pointer.is_some() {
        return Err(RuntimeExprError::PointerNotAllowed);
    }

    if let Some(index) = head.strip_prefix("idPath.") {
        let index = index
            .parse::<usize>()
            .map_err(|_| RuntimeExprError::InvalidIndex(index.to_string()))?;
        return Ok(RuntimeExpr::IdPath(index));
    }
    if let Some(name) = head.strip_prefix("idMap.") {
        check_name(name)?;
        return Ok(RuntimeExpr::IdMap(name.to_string()));
    }
    if let Some(name) = head.strip_prefix("header.") {
        if name.is_empty() {
            return Err(RuntimeExprError::EmptyName);
        }
        if !TCHAR_RE.is_match(name) {
            return Err(RuntimeExprError::InvalidHeaderName(name.to_string()));
        }
        return Ok(RuntimeExpr::Header(name.to_string()));
    }

    Err(RuntimeExprError::UnknownExpression(head.to_string()))
}

fn check_name(name: &str) -> Result<(), RuntimeExprError> {
    if name.is_empty() {
        return Err(RuntimeExprError::EmptyName);
    }
    if !NAME_RE.is_match(name) {
        return Err(RuntimeExprError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeExprError {
    #[error("runtime expression must start with '$'")]
    MissingDollarPrefix,
    #[error("unknown runtime expression: ${0}")]
    UnknownExpression(String),
    #[error("empty name in runtime expression")]
    EmptyName,
    #[error("invalid name in runtime expression: {0}")]
    InvalidName(String),
    #[error("invalid header name in runtime expression: {0}")]
    InvalidHeaderName(String),
    #[error("invalid idPath index: {0}")]
    InvalidIndex(String),
    #[error("json pointer is only allowed on $input expressions")]
    PointerNotAllowed,
    #[error("invalid json pointer: {0}")]
    InvalidJsonPointer(JsonPointerError),
}
