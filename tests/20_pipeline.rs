mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};

use mobile_api::config::AppConfig;
use mobile_api::error::HandlerError;
use mobile_api::pipeline::{Executor, ExecutorResponse, RequestContext};
use mobile_api::routes::{RateLimitConfig, RouteConfig, RouteDescriptor, RouteRegistry};
use mobile_api::types::{AuthLevel, HttpMethod};
use mobile_api::AppState;

use common::{anonymous, body_json, body_string, signed_in, TestApp};

/// Echoes the validated request back as data
struct Echo;

#[async_trait]
impl Executor for Echo {
    async fn execute(&self, ctx: &RequestContext, _: &AppState) -> Result<ExecutorResponse, HandlerError> {
        Ok(ExecutorResponse {
            status: 201,
            data: json!({
                "params": ctx.input.params,
                "query": ctx.input.query,
                "body": ctx.input.body,
                "principal": ctx.principal,
            }),
        })
    }
}

/// Returns a fixed status and payload
struct Fixed(u16, Value);

#[async_trait]
impl Executor for Fixed {
    async fn execute(&self, _: &RequestContext, _: &AppState) -> Result<ExecutorResponse, HandlerError> {
        Ok(ExecutorResponse {
            status: self.0,
            data: self.1.clone(),
        })
    }
}

fn item_request_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "params": {
                "type": "object",
                "properties": { "id": { "type": "integer" } },
                "required": ["id"]
            },
            "query": {
                "type": "object",
                "properties": { "full": { "type": "boolean", "default": false } }
            },
            "body": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "quantity": { "type": "integer" }
                },
                "required": ["name"]
            }
        }
    })
}

fn app() -> Result<TestApp> {
    let mut registry = RouteRegistry::new();
    registry
        .register(
            RouteDescriptor::new("items/update-item")
                .config(RouteConfig::new(AuthLevel::NoSession, HttpMethod::Put, "/v1/items/:id(\\d+)"))
                .request_schema(item_request_schema())
                .executor(Arc::new(Echo)),
        )
        .register(
            RouteDescriptor::new("items/broken")
                .config(RouteConfig::new(AuthLevel::NoSession, HttpMethod::Get, "/v1/broken"))
                .executor(Arc::new(Fixed(201, json!({ "name": "no id" }))))
                .response_schema(json!({ "type": "object", "required": ["id"] })),
        )
        .register(
            RouteDescriptor::new("items/me")
                .config(RouteConfig::new(AuthLevel::UserLogin, HttpMethod::Get, "/v1/me"))
                .executor(Arc::new(Echo)),
        )
        .register(
            RouteDescriptor::new("items/echo")
                .config(RouteConfig::new(AuthLevel::NoSession, HttpMethod::Post, "/v1/echo"))
                .executor(Arc::new(Echo)),
        )
        .register(
            RouteDescriptor::new("items/limited")
                .config(
                    RouteConfig::new(AuthLevel::NoSession, HttpMethod::Post, "/v1/limited")
                        .with_rate_limit(RateLimitConfig::new(Duration::from_secs(60), 2).with_message("Slow down")),
                )
                .executor(Arc::new(Fixed(200, json!({ "ok": true })))),
        );

    let mut config = AppConfig::development();
    config.api.max_request_size_bytes = 1024;
    TestApp::with_registry(registry, config)
}

#[tokio::test]
async fn valid_request_reaches_executor_with_coerced_input() -> Result<()> {
    let app = app()?;

    let req = anonymous(
        Method::PUT,
        "/v1/items/42",
        Some(json!({ "name": "pen", "quantity": "3" })),
    );
    let res = app.send(req).await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await?;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["params"]["id"], json!(42));
    assert_eq!(body["data"]["query"]["full"], json!(false));
    assert_eq!(body["data"]["body"]["quantity"], json!(3));
    assert_eq!(body["data"]["principal"], json!({ "noSession": true }));
    Ok(())
}

#[tokio::test]
async fn missing_required_field_is_request_violation() -> Result<()> {
    let app = app()?;

    let res = app
        .send(anonymous(Method::PUT, "/v1/items/42", Some(json!({ "quantity": 1 }))))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = body_json(res).await?;
    assert_eq!(body["success"], json!(false));
    assert!(body.get("data").is_none());

    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["code"], json!("4221"));
    assert!(errors[0]["message"].as_str().unwrap().contains("name"));
    Ok(())
}

#[tokio::test]
async fn response_mismatch_keeps_executor_status() -> Result<()> {
    let app = app()?;

    let res = app.send(anonymous(Method::GET, "/v1/broken", None)).await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await?;
    assert_eq!(body["success"], json!(false));
    assert!(body.get("data").is_none());
    assert_eq!(body["errors"][0]["code"], json!("4222"));
    Ok(())
}

#[tokio::test]
async fn invalid_json_body_short_circuits() -> Result<()> {
    let app = app()?;

    let req = Request::builder()
        .method(Method::PUT)
        .uri("/v1/items/42")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))?;
    let res = app.send(req).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = body_json(res).await?;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0]["code"], json!(""));
    Ok(())
}

fn raw(method: Method, uri: &str, content_type: &str, body: &'static str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))?)
}

#[tokio::test]
async fn form_body_is_decoded_and_coerced() -> Result<()> {
    let app = app()?;

    let req = raw(
        Method::PUT,
        "/v1/items/42",
        "application/x-www-form-urlencoded",
        "name=blue+pen&quantity=2",
    )?;
    let res = app.send(req).await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await?;
    assert_eq!(body["data"]["body"]["name"], json!("blue pen"));
    assert_eq!(body["data"]["body"]["quantity"], json!(2));
    Ok(())
}

#[tokio::test]
async fn plain_text_body_is_ignored() -> Result<()> {
    let app = app()?;

    let res = app.send(raw(Method::POST, "/v1/echo", "text/plain", "hello")?).await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await?;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["body"], json!({}));
    Ok(())
}

#[tokio::test]
async fn repeated_query_keys_become_arrays() -> Result<()> {
    let app = app()?;

    let res = app
        .send(anonymous(Method::POST, "/v1/echo?tag=a&tag=b&page=2", None))
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await?;
    assert_eq!(body["data"]["query"], json!({ "tag": ["a", "b"], "page": "2" }));
    Ok(())
}

#[tokio::test]
async fn unmatched_path_constraint_is_not_a_route() -> Result<()> {
    let app = app()?;

    let res = app.send(anonymous(Method::GET, "/v1/items", None)).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn signed_in_route_sees_the_user() -> Result<()> {
    let app = app()?;

    let res = app.send(signed_in(Method::GET, "/v1/me", None)).await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = body_json(res).await?;
    assert_eq!(body["data"]["principal"]["email"], json!(common::EMAIL));
    Ok(())
}

#[tokio::test]
async fn per_route_rate_limit_rejects_with_message() -> Result<()> {
    let app = app()?;

    for _ in 0..2 {
        let res = app.send(anonymous(Method::POST, "/v1/limited", None)).await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app.send(anonymous(Method::POST, "/v1/limited", None)).await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_string(res).await?, "Slow down");
    Ok(())
}

#[tokio::test]
async fn oversized_body_is_rejected() -> Result<()> {
    let app = app()?;

    let name = "x".repeat(2048);
    let res = app
        .send(anonymous(Method::PUT, "/v1/items/42", Some(json!({ "name": name }))))
        .await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}

#[tokio::test]
async fn global_rate_limit_applies_to_every_route() -> Result<()> {
    let mut config = AppConfig::development();
    config.api.rate_limit_requests = 1;
    let app = TestApp::with_registry(mobile_api::endpoints::registry(), config)?;

    let first = app.send(anonymous(Method::GET, "/application/health", None)).await?;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.send(anonymous(Method::GET, "/nope", None)).await?;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_string(second).await?, "Too many requests");
    Ok(())
}
