// Drives one request through a route's compiled chain

use serde_json::{json, Value};

use crate::error::HandlerError;
use crate::pipeline::context::{RequestContext, SchemaKind};
use crate::pipeline::envelope::FinalResponse;
use crate::pipeline::step::StepAction;
use crate::routes::Route;
use crate::schema::{CompiledSchema, Violation};
use crate::state::AppState;

/// Run every step in weight order and return what the final step produced.
///
/// Steps before FINAL are skipped once the context holds an error. FINAL runs
/// exactly once, whatever happened before it.
pub async fn drive(route: &Route, ctx: &mut RequestContext, state: &AppState) -> FinalResponse {
    for step in &route.steps {
        if matches!(step.action, StepAction::Final) {
            return finalize(route, ctx);
        }

        if ctx.has_errors() {
            tracing::trace!("Skipping {} for '{}'", step.kind().as_str(), route.name);
            continue;
        }

        tracing::trace!("Running {} for '{}'", step.kind().as_str(), route.name);
        run_step(route, &step.action, ctx, state).await;
    }

    finalize(route, ctx)
}

async fn run_step(route: &Route, action: &StepAction, ctx: &mut RequestContext, state: &AppState) {
    match action {
        StepAction::RequestSchema(schema) => validate_request(schema, ctx),
        StepAction::Executor(executor) => match executor.execute(ctx, state).await {
            Ok(response) => ctx.set_response(response.status, response.data),
            Err(error) => {
                if !error.is_expected() {
                    state.reporter.report(&route.name, &ctx.trace_id, &error);
                }
                ctx.add_error(error);
            }
        },
        StepAction::ResponseSchema(schema) => validate_response(schema, ctx),
        StepAction::Final => {}
    }
}

fn finalize(route: &Route, ctx: &RequestContext) -> FinalResponse {
    let response = FinalResponse::from_context(ctx);
    tracing::debug!(
        "{} {} -> {} in {:?} (trace {})",
        route.config.http_method,
        route.config.path,
        response.status.as_u16(),
        ctx.started_at.elapsed(),
        ctx.trace_id
    );
    response
}

fn validate_request(schema: &CompiledSchema, ctx: &mut RequestContext) {
    let mut document = ctx.input.to_value();
    match schema.validate(&mut document) {
        Ok(()) => ctx.input.replace_from(document),
        Err(violations) => {
            ctx.add_schema_errors(SchemaKind::Request, violations.into_iter().map(violation_error))
        }
    }
}

fn validate_response(schema: &CompiledSchema, ctx: &mut RequestContext) {
    let mut data = ctx.data.take().unwrap_or(Value::Null);
    let result = schema.validate(&mut data);
    ctx.data = Some(data);

    if let Err(violations) = result {
        ctx.add_schema_errors(SchemaKind::Response, violations.into_iter().map(violation_error));
    }
}

fn violation_error(violation: Violation) -> HandlerError {
    HandlerError::new(violation.message).with_data(json!({
        "instancePath": violation.instance_path,
        "schemaPath": violation.schema_path,
    }))
}
