#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use mobile_api::config::AppConfig;
use mobile_api::endpoints;
use mobile_api::routes::RouteRegistry;
use mobile_api::identity::IdentityProvider;
use mobile_api::testing::{identity, state_with, MemoryUserStore, StaticIdentityProvider};
use mobile_api::build_router;

pub const TOKEN: &str = "valid-token";
pub const EMAIL: &str = "ada@example.com";

/// The application router wired to in-memory fakes
pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUserStore>,
}

impl TestApp {
    /// Every production endpoint, development profile
    pub fn new() -> Result<Self> {
        Self::with_registry(endpoints::registry(), AppConfig::development())
    }

    pub fn with_registry(registry: RouteRegistry, config: AppConfig) -> Result<Self> {
        let provider = StaticIdentityProvider::default().with_token(TOKEN, identity("uid-1", EMAIL));
        Self::build(registry, config, Arc::new(provider))
    }

    /// Every production endpoint, verifying tokens with `provider`
    pub fn with_identity(provider: Arc<dyn IdentityProvider>) -> Result<Self> {
        Self::build(endpoints::registry(), AppConfig::development(), provider)
    }

    fn build(registry: RouteRegistry, config: AppConfig, provider: Arc<dyn IdentityProvider>) -> Result<Self> {
        let users = Arc::new(MemoryUserStore::default());
        let state = state_with(users.clone(), provider);

        let table = registry.load()?;
        let router = build_router(&table, state, &config);

        Ok(Self { router, users })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        Ok(self.router.clone().oneshot(request).await?)
    }
}

/// Request carrying a valid bearer token and mobile headers
pub fn signed_in(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", TOKEN))
        .header("platform", "android")
        .header("version", "1.4.0");

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn anonymous(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_bytes(response: Response<Body>) -> Result<Vec<u8>> {
    Ok(response.into_body().collect().await?.to_bytes().to_vec())
}

pub async fn body_json(response: Response<Body>) -> Result<Value> {
    Ok(serde_json::from_slice(&body_bytes(response).await?)?)
}

pub async fn body_string(response: Response<Body>) -> Result<String> {
    Ok(String::from_utf8(body_bytes(response).await?)?)
}
