use std::collections::BTreeMap;

use destiny_core::expressions::{
    parse_runtime_expr, parse_template, render_string, resolve_value, ExpressionScope, JsonPointer,
    JsonPointerError, RuntimeExpr, TemplateError,
};
use destiny_core::types::{ClientError, ErrorKind, HeaderGenerator};
use serde_json::{json, Value};

struct Scope {
    inputs: BTreeMap<String, Value>,
    id_path: Vec<String>,
}

impl ExpressionScope for Scope {
    fn input(&self, name: &str) -> Option<Value> {
        self.inputs.get(name).cloned()
    }
    fn id_path(&self, index: usize) -> Option<String> {
        self.id_path.get(index).cloned()
    }
    fn id_map(&self, name: &str) -> Option<String> {
        (name == "race").then(|| "77".to_string())
    }
    fn header(&self, name: &str) -> Option<String> {
        (name == "X-Request-Id").then(|| "req-1".to_string())
    }
}

fn scope() -> Scope {
    let mut inputs = BTreeMap::new();
    inputs.insert("id".to_string(), json!(7));
    inputs.insert("filter".to_string(), json!({"kind": "sprint"}));
    Scope {
        inputs,
        id_path: vec!["race".to_string(), "12".to_string()],
    }
}

#[test]
fn parses_supported_expressions() {
    assert_eq!(
        parse_runtime_expr("$idPath.1").unwrap(),
        RuntimeExpr::IdPath(1)
    );
    assert_eq!(
        parse_runtime_expr("$idMap.race").unwrap(),
        RuntimeExpr::IdMap("race".to_string())
    );
    assert_eq!(
        parse_runtime_expr("$header.X-Request-Id").unwrap(),
        RuntimeExpr::Header("X-Request-Id".to_string())
    );
    assert!(parse_runtime_expr("$steps.a").is_err());
    assert!(parse_runtime_expr("$idPath.x").is_err());
    assert!(parse_runtime_expr("$header.X#/a").is_err());
}

#[test]
fn single_expression_keeps_its_type() {
    let s = scope();
    assert_eq!(resolve_value(&json!("$input.id"), &s).unwrap(), json!(7));
    assert_eq!(resolve_value(&json!("{$input.id}"), &s).unwrap(), json!(7));
    assert_eq!(
        resolve_value(&json!("$input.filter#/kind"), &s).unwrap(),
        json!("sprint")
    );
    assert_eq!(resolve_value(&json!("$input.absent"), &s).unwrap(), Value::Null);
}

#[test]
fn embedded_expressions_render_as_text() {
    let s = scope();
    assert_eq!(
        resolve_value(&json!("race-{$input.id}-{$idPath.1}"), &s).unwrap(),
        json!("race-7-12")
    );
    assert_eq!(
        render_string("http://h/{$idMap.race}/$0", &s).unwrap(),
        "http://h/77/$0"
    );
    assert_eq!(render_string("$header.X-Request-Id", &s).unwrap(), "req-1");
}

#[test]
fn dollar_digit_is_not_an_expression() {
    let s = scope();
    assert_eq!(resolve_value(&json!("$5.00"), &s).unwrap(), json!("$5.00"));
}

#[test]
fn braces_without_dollar_are_literal() {
    let t = parse_template("{\"a\": 1}").unwrap();
    assert_eq!(t.expressions().count(), 0);
    assert_eq!(
        parse_template("x {$input.id").unwrap_err(),
        TemplateError::UnclosedExpression
    );
}

#[test]
fn client_error_body_omits_code() {
    let err = ClientError::new("not_found", "no such race").with_code(404);
    assert_eq!(err.status(), 404);
    assert_eq!(err.error, ErrorKind::Custom("not_found".to_string()));
    assert_eq!(err.to_body(), json!({"error": "not_found", "msg": "no such race"}));
    assert_eq!(ClientError::server("x").status(), 500);
}

#[test]
fn header_generators_parse() {
    assert_eq!(
        HeaderGenerator::from("static: v1 ".to_string()),
        HeaderGenerator::Static("v1".to_string())
    );
    assert!(HeaderGenerator::from("forward-else-guid".to_string()).falls_back_to_guid());
    assert!(HeaderGenerator::from("forward-else-ip".to_string()).forwards());
    assert!(matches!(
        HeaderGenerator::from("random".to_string()),
        HeaderGenerator::Unknown(_)
    ));
}

#[test]
fn json_pointer_decodes_escapes_and_walks_arrays() {
    let doc = json!({"a/b": {"m~n": [10, {"x": true}]}, "rows": ["r0"]});

    let pointer = JsonPointer::parse("/a~1b/m~0n/1/x").unwrap();
    assert_eq!(pointer.tokens(), ["a/b", "m~n", "1", "x"]);
    assert_eq!(pointer.resolve(&doc), Some(&json!(true)));

    assert_eq!(JsonPointer::parse("#/rows/0").unwrap().resolve(&doc), Some(&json!("r0")));
    assert_eq!(JsonPointer::parse("/rows/00").unwrap().resolve(&doc), None);
    assert_eq!(JsonPointer::parse("/rows/-").unwrap().resolve(&doc), None);
    assert!(JsonPointer::parse("").unwrap().is_root());
    assert_eq!(JsonPointer::parse("").unwrap().resolve(&doc), Some(&doc));
}

#[test]
fn json_pointer_rejects_malformed_input() {
    assert_eq!(JsonPointer::parse("rows"), Err(JsonPointerError::InvalidPrefix));
    assert_eq!(JsonPointer::parse("/a~2"), Err(JsonPointerError::InvalidEscape));
    assert_eq!(JsonPointer::parse("/a~"), Err(JsonPointerError::InvalidEscape));
}
