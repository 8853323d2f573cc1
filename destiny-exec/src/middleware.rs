use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::endpoint::InboundRequest;
use crate::error::ScriptError;
use crate::workflow::Workflow;

/// Runs before the request handler, in the order an endpoint lists it.
///
/// Returning continues the chain; an error set on the workflow renders it immediately.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn request(
        &self,
        req: &InboundRequest,
        wf: &mut Workflow,
        ctx: &mut ExecutionContext,
    ) -> Result<(), ScriptError>;
}

#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) {
        self.entries.insert(name.into(), middleware);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Middleware>> {
        self.entries.get(name)
    }
}
