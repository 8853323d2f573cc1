use crate::types::{EndpointContract, FieldMap, FieldType, OutputKind};
use crate::validate::validator::{Validator, FIELD_RE};

pub(crate) fn validate_contract(v: &mut Validator, path: &str, contract: &EndpointContract) {
    validate_input_fields(v, &format!("{path}.input.required"), &contract.input.required);
    validate_input_fields(v, &format!("{path}.input.optional"), &contract.input.optional);
    for name in contract.input.required.keys() {
        if contract.input.optional.contains_key(name) {
            v.push(
                format!("{path}.input.optional.{name}"),
                "declared both required and optional",
            );
        }
    }

    let output = &contract.output;
    match &output.kind {
        OutputKind::Invalid(kind) => {
            v.push(
                format!("{path}.output.type"),
                format!("must be 'object' or 'array', was '{kind}'"),
            );
        }
        OutputKind::Array => {
            if !output.required.is_empty() || !output.optional.is_empty() {
                v.push(
                    format!("{path}.output"),
                    "array output does not take a field schema",
                );
            }
        }
        OutputKind::Object => {}
    }
    validate_output_fields(v, &format!("{path}.output.required"), &output.required);
    validate_output_fields(v, &format!("{path}.output.optional"), &output.optional);
}

fn validate_input_fields(v: &mut Validator, path: &str, fields: &FieldMap) {
    for (name, spec) in fields {
        check_field_name(v, path, name);
        match &spec.field_type {
            FieldType::String | FieldType::Boolean | FieldType::Number => {}
            other => v.push(
                format!("{path}.{name}.type"),
                format!("input type ({other}) is not supported"),
            ),
        }
    }
}

fn validate_output_fields(v: &mut Validator, path: &str, fields: &FieldMap) {
    for (name, spec) in fields {
        check_field_name(v, path, name);
        if let FieldType::Unsupported(t) = &spec.field_type {
            v.push(format!("{path}.{name}.type"), format!("unknown type '{t}'"));
        }
    }
}

fn check_field_name(v: &mut Validator, path: &str, name: &str) {
    if !FIELD_RE.is_match(name) {
        v.push(format!("{path}.{name}"), "field names must match [a-zA-Z0-9.-_]+");
    }
}
