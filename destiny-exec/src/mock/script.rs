use std::sync::Arc;

use destiny_core::ParamMap;
use serde_json::Value;

use crate::context::{CallStatus, InterceptContext, MockContext};
use crate::error::{ScriptError, ScriptSource};

/// Computes a mock payload.
pub trait MockScript: Send + Sync {
    fn get_results(&self, ctx: &MockContext, params: &ParamMap, status: u16) -> Result<Value, ScriptError>;

    fn source(&self) -> Option<&ScriptSource> {
        None
    }
}

/// Post-processes a successful real response.
///
/// Implementations must pass the replacement to [`Rewrite::results`].
pub trait InterceptScript: Send + Sync {
    fn intercept_results(
        &self,
        ctx: &InterceptContext,
        params: &ParamMap,
        status: &CallStatus,
        response: Value,
        rewrite: &mut Rewrite,
    ) -> Result<(), ScriptError>;

    fn source(&self) -> Option<&ScriptSource> {
        None
    }
}

/// Receives the interceptor's replacement response.
#[derive(Debug, Default)]
pub struct Rewrite {
    results: Option<Value>,
}

impl Rewrite {
    pub fn results(&mut self, value: Value) {
        self.results = Some(value);
    }

    pub(crate) fn into_results(self) -> Option<Value> {
        self.results
    }
}

#[derive(Clone)]
pub enum MockDescriptor {
    Static(Value),
    Script(Arc<dyn MockScript>),
}

impl std::fmt::Debug for MockDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockDescriptor::Static(v) => f.debug_tuple("Static").field(v).finish(),
            MockDescriptor::Script(_) => f.write_str("Script(..)"),
        }
    }
}
