use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declared type of an input parameter or output field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Boolean,
    Number,
    Array,
    /// `object`, also spelled `dictionary` or `map`.
    Object,
    Unsupported(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Number => "number",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Unsupported(s) => s.as_str(),
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "string" => FieldType::String,
            "boolean" => FieldType::Boolean,
            "number" => FieldType::Number,
            "array" => FieldType::Array,
            "object" | "dictionary" | "map" => FieldType::Object,
            _ => FieldType::Unsupported(s),
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self { field_type }
    }
}

/// Field name to declared type, in declaration order.
pub type FieldMap = IndexMap<String, FieldSpec>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputContract {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub required: FieldMap,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub optional: FieldMap,
}

impl InputContract {
    pub fn required(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.required.insert(name.into(), FieldSpec::new(field_type));
        self
    }

    pub fn optional(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.optional.insert(name.into(), FieldSpec::new(field_type));
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.required.contains_key(name) || self.optional.contains_key(name)
    }
}

/// Shape of the rendered output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputKind {
    #[default]
    Object,
    Array,
    Invalid(String),
}

impl OutputKind {
    pub fn as_str(&self) -> &str {
        match self {
            OutputKind::Object => "object",
            OutputKind::Array => "array",
            OutputKind::Invalid(s) => s.as_str(),
        }
    }
}

impl From<String> for OutputKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "object" => OutputKind::Object,
            "array" => OutputKind::Array,
            _ => OutputKind::Invalid(s),
        }
    }
}

impl From<OutputKind> for String {
    fn from(k: OutputKind) -> Self {
        k.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputContract {
    #[serde(default, rename = "type")]
    pub kind: OutputKind,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub required: FieldMap,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub optional: FieldMap,
}

impl OutputContract {
    pub fn object() -> Self {
        Self::default()
    }

    pub fn array() -> Self {
        Self {
            kind: OutputKind::Array,
            ..Self::default()
        }
    }

    pub fn required(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.required.insert(name.into(), FieldSpec::new(field_type));
        self
    }

    pub fn optional(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.optional.insert(name.into(), FieldSpec::new(field_type));
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.required.contains_key(name) || self.optional.contains_key(name)
    }
}

/// Input and output schema an endpoint declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointContract {
    #[serde(default)]
    pub input: InputContract,
    #[serde(default)]
    pub output: OutputContract,
}

impl EndpointContract {
    pub fn new(input: InputContract, output: OutputContract) -> Self {
        Self { input, output }
    }
}
