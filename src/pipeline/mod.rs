//! Per-route handler chain: compilation at load time, execution per request.

pub mod context;
pub mod envelope;
pub mod executor;
pub mod report;
pub mod runner;
pub mod step;

pub use context::{Principal, RequestContext, RequestInput, SchemaKind};
pub use envelope::{ErrorEntry, FinalResponse, ResponseEnvelope};
pub use executor::{Executor, ExecutorResponse};
pub use report::{ErrorReporter, TracingReporter};
pub use runner::drive;
pub use step::{compile_chain, ChainArtifacts, HandlerKind, HandlerStep, StepAction};
