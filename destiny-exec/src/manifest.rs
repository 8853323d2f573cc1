use std::sync::Arc;

use destiny_core::expressions::{render_string, resolve_value, ExpressionScope, JsonPointer, TemplateError};
use destiny_core::validate::WHOLE_OUTPUT;
use destiny_core::{
    parse_manifest_str, validate_manifest, CallSpec, DocumentFormat, EndpointConfig,
    EndpointContract, EndpointManifest, ManifestCall, ParseError, ValidationError,
};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::endpoint::Endpoint;
use crate::error::ScriptError;
use crate::workflow::Workflow;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Endpoint driven by a declarative manifest: one request handler fanning out
/// to every call, results mapped into the output by JSON pointer.
#[derive(Debug, Clone)]
pub struct ManifestEndpoint {
    manifest: EndpointManifest,
    calls: Arc<Vec<ManifestCall>>,
}

impl ManifestEndpoint {
    pub fn new(manifest: EndpointManifest) -> Self {
        let calls = Arc::new(manifest.calls.clone());
        Self { manifest, calls }
    }

    /// Parse and validate a manifest document.
    pub fn parse(raw: &str, format: DocumentFormat) -> Result<Self, ManifestError> {
        let parsed = parse_manifest_str(raw, format)?;
        validate_manifest(&parsed.manifest)?;
        Ok(Self::new(parsed.manifest))
    }

    pub fn manifest(&self) -> &EndpointManifest {
        &self.manifest
    }
}

impl Endpoint for ManifestEndpoint {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn contract(&self) -> &EndpointContract {
        &self.manifest.contract
    }

    fn config(&self) -> &EndpointConfig {
        &self.manifest.config
    }

    fn register(&self, ctx: &mut ExecutionContext) -> Result<(), ScriptError> {
        let calls = self.calls.clone();
        ctx.request(move |_ctx, wf| {
            for call in calls.iter() {
                let (target, spec) = resolve_call(call, &WorkflowScope(wf))
                    .map_err(|e| ScriptError::new(format!("{}: {e}", call.id)))?;
                wf.call_as(call.id.clone(), target, spec)?;
            }
            Ok(())
        })?;

        for call in self.calls.iter() {
            let outputs = call.outputs.clone();
            ctx.results(call.id.clone(), move |_ctx, wf, _status, body| {
                for (field, pointer) in &outputs {
                    let pointer = JsonPointer::parse(pointer)
                        .map_err(|e| ScriptError::new(format!("{field}: {e}")))?;
                    if let Some(value) = pointer.resolve(&body) {
                        write_field(wf, field, value.clone())?;
                    }
                }
                Ok(())
            })?;

            if let Some(fallback) = call.fallback.clone() {
                ctx.exception(call.id.clone(), move |_ctx, wf, _status, _body| {
                    for (field, value) in &fallback {
                        write_field(wf, field, value.clone())?;
                    }
                    Ok(())
                })?;
            }
        }
        Ok(())
    }
}

fn write_field(wf: &mut Workflow, field: &str, value: Value) -> Result<(), ScriptError> {
    if field == WHOLE_OUTPUT {
        wf.output_array(value)
    } else {
        wf.output(field, value)
    }
}

/// Target and options of `call` with every runtime expression evaluated.
fn resolve_call(call: &ManifestCall, scope: &dyn ExpressionScope) -> Result<(String, CallSpec), TemplateError> {
    let mut spec = call.spec.clone();
    for value in spec.params.values_mut() {
        *value = resolve_value(value, scope)?;
    }
    for id in spec.rest_ids.iter_mut() {
        *id = render_string(id, scope)?;
    }
    for value in spec.headers.values_mut().flatten() {
        *value = render_string(value, scope)?;
    }
    Ok((render_string(&call.target, scope)?, spec))
}

struct WorkflowScope<'w>(&'w Workflow);

impl ExpressionScope for WorkflowScope<'_> {
    fn input(&self, name: &str) -> Option<Value> {
        self.0.param(name).cloned()
    }

    fn id_path(&self, index: usize) -> Option<String> {
        self.0.id_path_at(index).map(str::to_string)
    }

    fn id_map(&self, name: &str) -> Option<String> {
        self.0.id_map(name).map(str::to_string)
    }

    fn header(&self, name: &str) -> Option<String> {
        self.0
            .http_header_parameter(name)
            .or_else(|| self.0.request_header(name))
            .map(str::to_string)
    }
}
