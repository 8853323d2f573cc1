use crate::types::EndpointManifest;
use crate::validate::validator::Validator;

use super::{calls, contract};

pub(crate) fn validate_manifest(v: &mut Validator, manifest: &EndpointManifest) {
    if manifest.name.trim().is_empty() {
        v.push("$.name", "must not be empty");
    }

    contract::validate_contract(v, "$", &manifest.contract);

    for (idx, name) in manifest.config.middleware.iter().enumerate() {
        if name.trim().is_empty() {
            v.push(format!("$.config.middleware[{idx}]"), "must not be empty");
        }
    }

    calls::validate_calls(v, "$.calls", &manifest.calls, &manifest.contract);
}
