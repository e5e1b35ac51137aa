use crate::routes::{RouteConfig, RouteDescriptor};
use crate::types::{AuthLevel, HttpMethod};

/// Liveness probe: no executor, answers with an empty success envelope
pub fn route() -> RouteDescriptor {
    RouteDescriptor::new("application/health").config(RouteConfig::new(
        AuthLevel::NoSession,
        HttpMethod::Get,
        "/application/health",
    ))
}
