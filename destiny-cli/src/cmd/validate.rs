use std::path::Path;

use destiny_core::{parse_manifest_str, validate_manifest, DocumentFormat};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::OutputArgs;

use super::config::read_file;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    name: String,
    format: String,
    calls: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub async fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
    let Some(content) = read_file(path, &output) else {
        return exit_codes::RUNTIME_ERROR;
    };

    let parsed = match parse_manifest_str(&content, DocumentFormat::Auto) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let errors: Vec<String> = match validate_manifest(&parsed.manifest) {
        Ok(()) => Vec::new(),
        Err(err) => err.violations.iter().map(ToString::to_string).collect(),
    };
    let result = ValidateResult {
        valid: errors.is_empty(),
        name: parsed.manifest.name.clone(),
        format: format!("{:?}", parsed.format),
        calls: parsed.manifest.calls.len(),
        errors,
    };

    match (result.valid, output.format == OutputFormat::Text && !output.quiet) {
        (true, true) => {
            println!(
                "ok: valid endpoint manifest {} ({:?}, {} calls)",
                result.name, parsed.format, result.calls
            );
        }
        (false, true) => {
            eprintln!("error: validation failed");
            for e in &result.errors {
                eprintln!("- {e}");
            }
        }
        _ => print_result(output.format, output.quiet, &result),
    }

    if result.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::VALIDATION_FAILED
    }
}
