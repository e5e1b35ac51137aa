use async_trait::async_trait;
use serde_json::Value;

use crate::error::HandlerError;
use crate::pipeline::context::RequestContext;
use crate::state::AppState;

/// Status and payload returned by an endpoint's business logic
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorResponse {
    pub status: u16,
    pub data: Value,
}

impl ExecutorResponse {
    pub fn ok(data: Value) -> Self {
        Self { status: 200, data }
    }
}

/// Business logic of one endpoint
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, ctx: &RequestContext, state: &AppState) -> Result<ExecutorResponse, HandlerError>;
}
