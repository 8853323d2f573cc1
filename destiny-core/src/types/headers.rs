use serde::{Deserialize, Serialize};

/// Where the value of a per-request header parameter comes from.
///
/// Parsed from the configured generator string: `static:<value>`, `forward`,
/// `forward-else-guid`, `forward-else-ip`, `guid` or `ip`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HeaderGenerator {
    Static(String),
    Forward,
    ForwardElseGuid,
    ForwardElseIp,
    Guid,
    Ip,
    Unknown(String),
}

impl HeaderGenerator {
    /// Whether the inbound request header is consulted first.
    pub fn forwards(&self) -> bool {
        matches!(
            self,
            HeaderGenerator::Forward | HeaderGenerator::ForwardElseGuid | HeaderGenerator::ForwardElseIp
        )
    }

    pub fn falls_back_to_guid(&self) -> bool {
        matches!(self, HeaderGenerator::ForwardElseGuid | HeaderGenerator::Guid)
    }

    pub fn falls_back_to_ip(&self) -> bool {
        matches!(self, HeaderGenerator::ForwardElseIp | HeaderGenerator::Ip)
    }
}

impl From<String> for HeaderGenerator {
    fn from(s: String) -> Self {
        if let Some(value) = s.strip_prefix("static:") {
            return HeaderGenerator::Static(value.trim().to_string());
        }
        match s.trim() {
            "forward" => HeaderGenerator::Forward,
            "forward-else-guid" => HeaderGenerator::ForwardElseGuid,
            "forward-else-ip" => HeaderGenerator::ForwardElseIp,
            "guid" => HeaderGenerator::Guid,
            "ip" => HeaderGenerator::Ip,
            _ => HeaderGenerator::Unknown(s),
        }
    }
}

impl From<HeaderGenerator> for String {
    fn from(g: HeaderGenerator) -> Self {
        match g {
            HeaderGenerator::Static(v) => format!("static:{v}"),
            HeaderGenerator::Forward => "forward".to_string(),
            HeaderGenerator::ForwardElseGuid => "forward-else-guid".to_string(),
            HeaderGenerator::ForwardElseIp => "forward-else-ip".to_string(),
            HeaderGenerator::Guid => "guid".to_string(),
            HeaderGenerator::Ip => "ip".to_string(),
            HeaderGenerator::Unknown(s) => s,
        }
    }
}

/// A header synthesized for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderParameter {
    pub name: String,
    pub generator: HeaderGenerator,
    /// Client-visible when set; otherwise kept in the internal-only set.
    #[serde(default)]
    pub return_in_response: bool,
    #[serde(default)]
    pub forward_to_depends: bool,
    /// Attach the value to every http-log record.
    #[serde(default)]
    pub http_log: bool,
}

impl HeaderParameter {
    pub fn new(name: impl Into<String>, generator: HeaderGenerator) -> Self {
        Self {
            name: name.into(),
            generator,
            return_in_response: false,
            forward_to_depends: false,
            http_log: false,
        }
    }

    pub fn returned(mut self) -> Self {
        self.return_in_response = true;
        self
    }

    pub fn forwarded(mut self) -> Self {
        self.forward_to_depends = true;
        self
    }

    pub fn logged(mut self) -> Self {
        self.http_log = true;
        self
    }
}
