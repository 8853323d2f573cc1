mod json_pointer;
mod runtime;
mod template;

pub use json_pointer::{JsonPointer, JsonPointerError};
pub use runtime::{parse_runtime_expr, RuntimeExpr, RuntimeExprError};
pub use template::{parse_template, Segment, Template, TemplateError};

use serde_json::Value;

/// Request data runtime expressions can read.
pub trait ExpressionScope {
    fn input(&self, name: &str) -> Option<Value>;
    fn id_path(&self, index: usize) -> Option<String>;
    fn id_map(&self, name: &str) -> Option<String>;
    fn header(&self, name: &str) -> Option<String>;
}

pub fn eval_expr(expr: &RuntimeExpr, scope: &dyn ExpressionScope) -> Option<Value> {
    match expr {
        RuntimeExpr::Input { name, pointer } => {
            let v = scope.input(name)?;
            match pointer {
                Some(p) => v.pointer(p.as_str()).cloned(),
                None => Some(v),
            }
        }
        RuntimeExpr::IdPath(i) => scope.id_path(*i).map(Value::String),
        RuntimeExpr::IdMap(name) => scope.id_map(name).map(Value::String),
        RuntimeExpr::Header(name) => scope.header(name).map(Value::String),
    }
}

/// Resolve every expression inside a value.
///
/// A string holding a single expression (`$input.id` or `{$input.id}`) takes the
/// expression's typed value (`null` when absent). Expressions embedded in longer
/// strings are rendered as text.
pub fn resolve_value(value: &Value, scope: &dyn ExpressionScope) -> Result<Value, TemplateError> {
    match value {
        Value::String(s) => resolve_string(s, scope),
        Value::Array(items) => items
            .iter()
            .map(|v| resolve_value(v, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve_value(v, scope)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Render a string, expressions always becoming text.
pub fn render_string(s: &str, scope: &dyn ExpressionScope) -> Result<String, TemplateError> {
    let trimmed = s.trim();
    if is_bare_expr(trimmed) {
        let expr = parse_runtime_expr(trimmed)?;
        return Ok(eval_expr(&expr, scope).map(|v| value_text(&v)).unwrap_or_default());
    }
    parse_template(s)?.render(scope)
}

fn resolve_string(s: &str, scope: &dyn ExpressionScope) -> Result<Value, TemplateError> {
    let trimmed = s.trim();
    if is_bare_expr(trimmed) {
        let expr = parse_runtime_expr(trimmed)?;
        return Ok(eval_expr(&expr, scope).unwrap_or(Value::Null));
    }
    let template = parse_template(s)?;
    if let [Segment::Expr(inner)] = template.segments.as_slice() {
        let expr = parse_runtime_expr(inner)?;
        return Ok(eval_expr(&expr, scope).unwrap_or(Value::Null));
    }
    template.render(scope).map(Value::String)
}

/// Whether a whole string is one unbraced expression such as `$input.id`.
///
/// `$` followed by a digit is a URL placeholder or plain text, not an expression.
pub fn is_bare_expr(s: &str) -> bool {
    s.strip_prefix('$')
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_alphabetic()))
}

/// Text form used when a value is embedded in a string, a query or a header.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Validate that any expression-like strings inside a value are syntactically valid.
pub fn validate_value_expressions(value: &Value) -> Result<(), TemplateError> {
    template::validate_value_expressions(value)
}
