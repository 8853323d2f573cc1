use serde::de::DeserializeOwned;

use crate::error::ParseError;
use crate::types::EndpointManifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub manifest: EndpointManifest,
    pub format: DocumentFormat,
}

pub fn parse_manifest_str(input: &str, format: DocumentFormat) -> Result<ParsedManifest, ParseError> {
    let (manifest, format) = parse_document_str::<EndpointManifest>(input, format)?;
    Ok(ParsedManifest { manifest, format })
}

/// Parse any JSON or YAML document, returning the format that succeeded.
///
/// Used for manifests as well as the engine configuration, test configuration
/// and mock files the CLI loads.
pub fn parse_document_str<T: DeserializeOwned>(
    input: &str,
    format: DocumentFormat,
) -> Result<(T, DocumentFormat), ParseError> {
    match format {
        DocumentFormat::Json => Ok((serde_json::from_str::<T>(input)?, format)),
        DocumentFormat::Yaml => Ok((serde_yaml::from_str::<T>(input)?, format)),
        DocumentFormat::Auto => parse_document_auto(input),
    }
}

fn parse_document_auto<T: DeserializeOwned>(input: &str) -> Result<(T, DocumentFormat), ParseError> {
    // JSON always starts with `{` or `[` after trimming.
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return Err(ParseError::UnknownFormat);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<T>(input) {
            Ok(doc) => Ok((doc, DocumentFormat::Json)),
            Err(e) => match serde_yaml::from_str::<T>(input) {
                Ok(doc) => Ok((doc, DocumentFormat::Yaml)),
                Err(_) => Err(ParseError::Json(e)),
            },
        };
    }

    match serde_yaml::from_str::<T>(input) {
        Ok(doc) => Ok((doc, DocumentFormat::Yaml)),
        Err(e) => {
            if let Ok(doc) = serde_json::from_str::<T>(input) {
                return Ok((doc, DocumentFormat::Json));
            }
            Err(ParseError::Yaml(e))
        }
    }
}
