use std::sync::Arc;

use serde_json::Value;

use crate::error::ConfigError;
use crate::pipeline::executor::Executor;
use crate::schema::CompiledSchema;

/// Kinds of steps a route's chain is made of, with their canonical weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum HandlerKind {
    RequestSchema = 100,  // Validate {params, query, body, headers}
    Executor = 200,       // Business logic
    ResponseSchema = 300, // Validate the executor's data
    Final = 1000,         // Build the envelope
}

impl HandlerKind {
    pub fn default_weight(&self) -> u32 {
        *self as u32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::RequestSchema => "REQUEST_SCHEMA",
            HandlerKind::Executor => "EXECUTOR",
            HandlerKind::ResponseSchema => "RESPONSE_SCHEMA",
            HandlerKind::Final => "FINAL",
        }
    }
}

#[derive(Clone)]
pub enum StepAction {
    RequestSchema(CompiledSchema),
    Executor(Arc<dyn Executor>),
    ResponseSchema(CompiledSchema),
    Final,
}

impl StepAction {
    pub fn kind(&self) -> HandlerKind {
        match self {
            StepAction::RequestSchema(_) => HandlerKind::RequestSchema,
            StepAction::Executor(_) => HandlerKind::Executor,
            StepAction::ResponseSchema(_) => HandlerKind::ResponseSchema,
            StepAction::Final => HandlerKind::Final,
        }
    }
}

#[derive(Clone)]
pub struct HandlerStep {
    pub weight: u32,
    pub action: StepAction,
}

impl HandlerStep {
    fn new(action: StepAction) -> Self {
        Self {
            weight: action.kind().default_weight(),
            action,
        }
    }

    pub fn kind(&self) -> HandlerKind {
        self.action.kind()
    }
}

impl std::fmt::Debug for HandlerStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.kind().as_str(), self.weight)
    }
}

/// Optional artifacts an endpoint may declare
#[derive(Clone, Default)]
pub struct ChainArtifacts {
    pub request_schema: Option<Value>,
    pub executor: Option<Arc<dyn Executor>>,
    pub response_schema: Option<Value>,
}

/// Build the weight-ordered step list for one route.
///
/// A step exists for each declared artifact, followed by exactly one FINAL.
pub fn compile_chain(route: &str, artifacts: ChainArtifacts) -> Result<Vec<HandlerStep>, ConfigError> {
    let mut steps = Vec::with_capacity(4);

    if let Some(schema) = artifacts.request_schema {
        let compiled = compile_schema(route, "requestSchema", schema)?;
        steps.push(HandlerStep::new(StepAction::RequestSchema(compiled)));
    }

    if let Some(executor) = artifacts.executor {
        steps.push(HandlerStep::new(StepAction::Executor(executor)));
    }

    if let Some(schema) = artifacts.response_schema {
        let compiled = compile_schema(route, "responseSchema", schema)?;
        steps.push(HandlerStep::new(StepAction::ResponseSchema(compiled)));
    }

    steps.push(HandlerStep::new(StepAction::Final));
    steps.sort_by_key(|step| step.weight);

    tracing::trace!("Compiled chain for '{}': {:?}", route, steps);
    Ok(steps)
}

fn compile_schema(route: &str, artifact: &'static str, schema: Value) -> Result<CompiledSchema, ConfigError> {
    CompiledSchema::compile(schema).map_err(|e| ConfigError::HandlerNotValid {
        route: route.to_string(),
        artifact,
        reason: e.to_string(),
    })
}
