use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "trace-id";

/// Correlation id of the current request, echoed as `traceId` in the envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

/// Take the inbound `trace-id` header, or mint a UUID v4, and log the route
pub async fn inject_trace_id(mut request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::info!(
        path = %request.uri().path(),
        trace_id = %trace_id,
        method = %request.method(),
        "ROUTE"
    );

    request.extensions_mut().insert(TraceId(trace_id));
    next.run(request).await
}
