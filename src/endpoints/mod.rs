//! Endpoint declarations. Each module contributes its route descriptors.

pub mod application;
pub mod auth;

use crate::routes::RouteRegistry;

/// Registry holding every endpoint of the service, in declaration order
pub fn registry() -> RouteRegistry {
    let mut registry = RouteRegistry::new();
    registry.register(application::health::route());
    registry.register(auth::google_verify::route());
    registry
}
