#![forbid(unsafe_code)]

pub mod error;
pub mod expressions;
pub mod parser;
pub mod types;
pub mod validate;

pub use crate::error::{ParseError, ValidationError, Violation};
pub use crate::parser::{parse_document_str, parse_manifest_str, DocumentFormat, ParsedManifest};
pub use crate::types::{
    AnyValue, BodyEncoding, CallSpec, ClientError, EndpointConfig, EndpointContract, EndpointManifest,
    ErrorKind, FieldMap, FieldSpec, FieldType, HeaderGenerator, HeaderParameter, InputContract,
    ManifestCall, MockSelection, OutputContract, OutputKind, ParamMap, TestCallConfig, TestConfig,
};
pub use crate::validate::{validate_manifest, Validate};
