use destiny_core::expressions::value_text;
use destiny_core::{ClientError, FieldType, InputContract, OutputContract, OutputKind, ParamMap};
use serde_json::{Number, Value};

/// Cast raw request parameters against `contract`.
///
/// The result holds required parameters then optional ones, in declaration order.
pub fn cast_inputs(contract: &InputContract, raw: &ParamMap) -> Result<ParamMap, ClientError> {
    let mut params = ParamMap::new();
    for (name, spec) in &contract.required {
        let Some(value) = raw.get(name) else {
            return Err(ClientError::input(format!("required input missing: {name}")));
        };
        params.insert(name.clone(), cast_input(name, value, &spec.field_type)?);
    }
    for (name, spec) in &contract.optional {
        if let Some(value) = raw.get(name) {
            params.insert(name.clone(), cast_input(name, value, &spec.field_type)?);
        }
    }
    Ok(params)
}

pub fn cast_input(name: &str, value: &Value, field_type: &FieldType) -> Result<Value, ClientError> {
    let wrong_type = || {
        ClientError::input(format!(
            "input is wrong type ({field_type}), was: {name} = {}",
            value_text(value)
        ))
    };
    match field_type {
        FieldType::String => Ok(match value {
            Value::String(_) => value.clone(),
            other => Value::String(value_text(other)),
        }),
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(wrong_type()),
        },
        FieldType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => parse_number(s).ok_or_else(wrong_type),
            _ => Err(wrong_type()),
        },
        other => Err(ClientError::server(format!(
            "input type ({other}) is not supported"
        ))),
    }
}

/// Numeric text to a JSON number: blank is zero, `0x` prefixes are hex,
/// integral values stay integers.
fn parse_number(s: &str) -> Option<Value> {
    let t = s.trim();
    if t.is_empty() {
        return Some(Value::Number(0.into()));
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return parse_hex(hex);
    }
    if let Ok(n) = t.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    if let Ok(n) = t.parse::<u64>() {
        return Some(Value::Number(n.into()));
    }
    if !t.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')) {
        return None;
    }
    // JSON has no infinity, so magnitudes past f64 saturate.
    let f = t
        .parse::<f64>()
        .ok()
        .filter(|f| !f.is_nan())?
        .clamp(f64::MIN, f64::MAX);
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        return Some(Value::Number((f as i64).into()));
    }
    Number::from_f64(f).map(Value::Number)
}

/// Hex digits of any length; past `u64` they accumulate as a float.
fn parse_hex(digits: &str) -> Option<Value> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if let Ok(n) = u64::from_str_radix(digits, 16) {
        return Some(Value::Number(n.into()));
    }
    let f = digits
        .chars()
        .filter_map(|c| c.to_digit(16))
        .fold(0.0_f64, |acc, d| acc * 16.0 + f64::from(d))
        .min(f64::MAX);
    Number::from_f64(f).map(Value::Number)
}

/// Validate the final output against `contract`.
pub fn check_output(contract: &OutputContract, output: &Value) -> Result<(), ClientError> {
    if contract.kind == OutputKind::Array {
        if !output.is_array() {
            return Err(ClientError::server("output must be an array"));
        }
        return Ok(());
    }

    for (name, spec) in &contract.required {
        match output.get(name) {
            None | Some(Value::Null) => {
                return Err(ClientError::server(format!("required output missing: {name}")))
            }
            Some(value) => check_type(name, value, &spec.field_type, "output")?,
        }
    }
    for (name, spec) in &contract.optional {
        if let Some(value) = output.get(name).filter(|v| !v.is_null()) {
            check_type(name, value, &spec.field_type, "output")?;
        }
    }
    Ok(())
}

pub fn check_type(name: &str, value: &Value, field_type: &FieldType, mode: &str) -> Result<(), ClientError> {
    let ok = match field_type {
        FieldType::String => value.is_string(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Number => value.is_number(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
        FieldType::Unsupported(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ClientError::input(format!(
            "{mode} is wrong type ({field_type}), was: {name} = {}",
            value_text(value)
        )))
    }
}
