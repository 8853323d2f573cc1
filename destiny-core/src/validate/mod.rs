mod rules;
mod validator;

use crate::error::ValidationError;
use crate::types::EndpointManifest;
use validator::Validator;

pub use rules::calls::{placeholder_count, WHOLE_OUTPUT};

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for EndpointManifest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_manifest(self)
    }
}

pub fn validate_manifest(manifest: &EndpointManifest) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.validate_manifest(manifest);
    v.finish()
}
