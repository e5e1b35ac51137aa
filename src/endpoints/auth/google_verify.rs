use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{ErrorCode, HandlerError};
use crate::pipeline::{Executor, ExecutorResponse, RequestContext};
use crate::routes::{RouteConfig, RouteDescriptor};
use crate::state::AppState;
use crate::types::{AuthLevel, HttpMethod};

/// POST /v1/auth/google-verify
///
/// The authorizer has already verified the Google ID token and resolved (or
/// created) the user; the endpoint returns that user.
pub fn route() -> RouteDescriptor {
    RouteDescriptor::new("auth/google-verify")
        .config(RouteConfig::new(
            AuthLevel::UserLogin,
            HttpMethod::Post,
            "/v1/auth/google-verify",
        ))
        .executor(Arc::new(VerifyExecutor))
        .response_schema(response_schema())
}

pub struct VerifyExecutor;

#[async_trait]
impl Executor for VerifyExecutor {
    async fn execute(&self, ctx: &RequestContext, _state: &AppState) -> Result<ExecutorResponse, HandlerError> {
        let user = ctx
            .user()
            .ok_or_else(|| HandlerError::new("No signed-in user").with_code(ErrorCode::Unauthorized))?;

        let data = serde_json::to_value(user)
            .map_err(|e| HandlerError::new(format!("Failed to serialize user: {}", e)))?;

        Ok(ExecutorResponse::ok(data))
    }
}

pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "userId": { "type": "integer" },
            "email": { "type": "string" },
            "name": { "type": ["string", "null"] },
            "birthDate": { "type": ["string", "null"] },
            "gender": { "type": ["string", "null"] },
            "image": { "type": ["string", "null"] },
            "version": { "type": ["string", "null"] },
            "platform": { "type": ["string", "null"] },
            "firebaseUid": { "type": ["string", "null"] },
            "isOnboarded": { "type": "boolean" },
            "createdAt": { "type": "string" }
        },
        "required": ["userId", "email", "name", "isOnboarded", "createdAt"]
    })
}
