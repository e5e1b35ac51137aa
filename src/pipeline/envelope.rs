use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::context::RequestContext;

/// One entry of the envelope's `errors` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Uniform body of every pipeline response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(rename = "traceId")]
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorEntry>>,
}

impl ResponseEnvelope {
    pub fn from_context(ctx: &RequestContext) -> Self {
        if ctx.has_errors() {
            let errors = ctx
                .errors()
                .iter()
                .map(|error| ErrorEntry {
                    message: error.message.clone(),
                    code: ctx.error_code(error),
                    data: error.data.clone(),
                })
                .collect();

            return Self {
                success: false,
                trace_id: ctx.trace_id.clone(),
                data: None,
                errors: Some(errors),
            };
        }

        Self {
            success: true,
            trace_id: ctx.trace_id.clone(),
            data: ctx.data.clone(),
            errors: None,
        }
    }
}

/// Status and envelope produced by the final step
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResponse {
    pub status: StatusCode,
    pub envelope: ResponseEnvelope,
}

impl FinalResponse {
    /// The executor's status when one was set, otherwise 400 if errored, else 200
    pub fn from_context(ctx: &RequestContext) -> Self {
        let fallback = if ctx.has_errors() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        let status = ctx
            .status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(fallback);

        Self {
            status,
            envelope: ResponseEnvelope::from_context(ctx),
        }
    }
}

impl IntoResponse for FinalResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
