mod call;
mod client_error;
mod common;
mod contract;
mod endpoint;
mod headers;
mod manifest;
mod mock;

pub use call::{BodyEncoding, CallSpec};
pub use client_error::{ClientError, ErrorKind};
pub use common::{AnyValue, ParamMap};
pub use contract::{
    EndpointContract, FieldMap, FieldSpec, FieldType, InputContract, OutputContract, OutputKind,
};
pub use endpoint::EndpointConfig;
pub use headers::{HeaderGenerator, HeaderParameter};
pub use manifest::{EndpointManifest, ManifestCall};
pub use mock::{MockSelection, TestCallConfig, TestConfig};
