use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::call::CallSpec;
use super::contract::EndpointContract;
use super::endpoint::EndpointConfig;

/// A declarative endpoint: contract, settings and the dependency calls to fan out to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointManifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub contract: EndpointContract,

    #[serde(default)]
    pub config: EndpointConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<ManifestCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestCall {
    pub id: String,

    /// Target URL; may contain `$0`-style placeholders and `{$...}` expressions.
    pub target: String,

    #[serde(flatten)]
    pub spec: CallSpec,

    /// Output field to JSON pointer into the call result.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, String>,

    /// Output values written when the call fails or times out.
    ///
    /// Declaring a fallback absorbs the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<IndexMap<String, serde_json::Value>>,
}
