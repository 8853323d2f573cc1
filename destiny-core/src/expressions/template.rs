use serde_json::Value;

use super::runtime::{parse_runtime_expr, RuntimeExprError};
use super::{eval_expr, is_bare_expr, value_text, ExpressionScope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn render(&self, scope: &dyn ExpressionScope) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Expr(e) => {
                    let expr = parse_runtime_expr(e)?;
                    if let Some(v) = eval_expr(&expr, scope) {
                        out.push_str(&value_text(&v));
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Expr(e) => Some(e.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

pub fn parse_template(input: &str) -> Result<Template, TemplateError> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' {
            // Only `{ $... }` is an embedded expression; other braces are literal text.
            let mut lookahead = chars.clone();
            while let Some(ws) = lookahead.peek() {
                if ws.is_whitespace() {
                    lookahead.next();
                } else {
                    break;
                }
            }
            if !matches!(lookahead.peek(), Some('$')) {
                buf.push('{');
                continue;
            }

            let mut inner = String::new();
            let mut found = false;
            for n in chars.by_ref() {
                if n == '}' {
                    found = true;
                    break;
                }
                inner.push(n);
            }
            if !found {
                return Err(TemplateError::UnclosedExpression);
            }

            let inner_trimmed = inner.trim();
            parse_runtime_expr(inner_trimmed)?;
            if !buf.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut buf)));
            }
            segments.push(Segment::Expr(inner_trimmed.to_string()));
        } else {
            buf.push(ch);
        }
    }

    if !buf.is_empty() {
        segments.push(Segment::Literal(buf));
    }

    Ok(Template { segments })
}

pub fn validate_value_expressions(value: &Value) -> Result<(), TemplateError> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
        Value::String(s) => validate_string_expressions(s),
        Value::Array(arr) => arr.iter().try_for_each(validate_value_expressions),
        Value::Object(map) => map.values().try_for_each(validate_value_expressions),
    }
}

fn validate_string_expressions(s: &str) -> Result<(), TemplateError> {
    let trimmed = s.trim();
    if is_bare_expr(trimmed) {
        parse_runtime_expr(trimmed)?;
        return Ok(());
    }
    parse_template(s)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid runtime expression: {0}")]
    InvalidRuntimeExpr(#[from] RuntimeExprError),
    #[error("unclosed embedded expression (missing '}}')")]
    UnclosedExpression,
}
