use crate::error::HandlerError;

/// Destination for unexpected executor failures
pub trait ErrorReporter: Send + Sync {
    fn report(&self, route: &str, trace_id: &str, error: &HandlerError);
}

/// Reports through the `tracing` error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, route: &str, trace_id: &str, error: &HandlerError) {
        tracing::error!(
            route = route,
            trace_id = trace_id,
            code = error.code.map(|c| c.as_u32()),
            "Executor failed: {}",
            error.message
        );
    }
}
