//! Route declarations and the compiled routing table.
//!
//! Every endpoint contributes one [`RouteDescriptor`]: a required
//! [`RouteConfig`] plus optional request schema, executor and response schema.
//! Descriptors are named `<tag>/<operation>` (`auth/google-verify`); the tag
//! groups routes in the generated API document.

pub mod registry;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::middleware::auth::Authorizer;
use crate::pipeline::{ChainArtifacts, Executor, HandlerStep, StepAction};
use crate::schema::CompiledSchema;
use crate::types::{AuthLevel, HttpMethod};

pub use registry::{compare_route_weights, RouteRegistry, RouteTable};

/// Per-route request ceiling, applied on top of the global limiter
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max: u32,
    pub message: Option<String>,
}

impl RateLimitConfig {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub auth_level: AuthLevel,
    pub http_method: HttpMethod,
    pub path: String,
    pub weight: Option<i64>,
    pub rate_limit: Option<RateLimitConfig>,
    pub deprecated: bool,
}

impl RouteConfig {
    pub fn new(auth_level: AuthLevel, http_method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            auth_level,
            http_method,
            path: path.into(),
            weight: None,
            rate_limit: None,
            deprecated: false,
        }
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }
}

/// What an endpoint declares, before validation
#[derive(Clone)]
pub struct RouteDescriptor {
    pub name: String,
    pub config: Option<RouteConfig>,
    pub artifacts: ChainArtifacts,
}

impl RouteDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
            artifacts: ChainArtifacts::default(),
        }
    }

    pub fn config(mut self, config: RouteConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn request_schema(mut self, schema: Value) -> Self {
        self.artifacts.request_schema = Some(schema);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.artifacts.executor = Some(executor);
        self
    }

    pub fn response_schema(mut self, schema: Value) -> Self {
        self.artifacts.response_schema = Some(schema);
        self
    }
}

/// A loaded route: immutable and shared by every request it serves
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub config: RouteConfig,
    /// Path as mounted on the router, parameter constraints removed
    pub router_path: String,
    pub authorizer: Authorizer,
    pub steps: Vec<HandlerStep>,
}

impl Route {
    pub fn request_schema(&self) -> Option<&CompiledSchema> {
        self.steps.iter().find_map(|step| match &step.action {
            StepAction::RequestSchema(schema) => Some(schema),
            _ => None,
        })
    }

    pub fn response_schema(&self) -> Option<&CompiledSchema> {
        self.steps.iter().find_map(|step| match &step.action {
            StepAction::ResponseSchema(schema) => Some(schema),
            _ => None,
        })
    }

    /// `tag` part of the `<tag>/<operation>` name
    pub fn tag(&self) -> &str {
        self.name.split('/').next().unwrap_or(&self.name)
    }

    /// `operation` part of the name, or the whole name when it has no tag
    pub fn operation(&self) -> &str {
        self.name.split_once('/').map(|(_, op)| op).unwrap_or(&self.name)
    }
}

/// Strip express-style constraints (`:id(\\d+)` → `:id`) from a declared path
pub fn router_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match (segment.starts_with(':'), segment.find('(')) {
            (true, Some(index)) => &segment[..index],
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}
