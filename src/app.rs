// HTTP shell: mounts the route table and wraps it in the global middleware

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, RawQuery, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json, Response},
    routing::{get, on, MethodRouter},
    Extension, Router,
};
use serde_json::{json, Map, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::docs;
use crate::error::HandlerError;
use crate::middleware::{
    enforce_rate_limit, inject_trace_id, no_session, user_login, Authorizer, RateLimiter, TraceId,
};
use crate::pipeline::{drive, FinalResponse, Principal, RequestContext, RequestInput};
use crate::routes::{Route, RouteTable};
use crate::state::AppState;

pub const DOCS_PATH: &str = "/mobile-api-docs";

/// Everything a mounted route needs to serve one request
#[derive(Clone)]
struct RouteHandle {
    route: Arc<Route>,
    state: AppState,
}

/// Build the complete application router
pub fn build_router(table: &RouteTable, state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new();

    for route in table.routes() {
        router = router.route(&route.router_path, mount(route.clone(), &state));
    }

    if config.docs.enabled {
        let document = Arc::new(docs::build_document(table));
        router = router.route(DOCS_PATH, get(serve_docs).with_state(document));
        tracing::info!("API document served at {}", DOCS_PATH);
    }

    let mut router = router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(from_fn(inject_trace_id));

    if config.api.enable_rate_limiting {
        let limiter = Arc::new(RateLimiter::new(
            Duration::from_secs(config.api.rate_limit_window_secs),
            config.api.rate_limit_requests,
            None,
        ));
        router = router.layer(from_fn_with_state(limiter, enforce_rate_limit));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer())
            .layer(SetResponseHeaderLayer::overriding(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            )),
    )
}

/// Method router for one route: authorizer, then the optional rate limit, then the chain
fn mount(route: Arc<Route>, state: &AppState) -> MethodRouter {
    let filter = route.config.http_method.method_filter();
    let rate_limit = route.config.rate_limit.clone();
    let authorizer = route.authorizer;

    let mut method_router: MethodRouter = on(filter, dispatch).with_state(RouteHandle {
        route,
        state: state.clone(),
    });

    if let Some(rate_limit) = rate_limit {
        let limiter = Arc::new(RateLimiter::from_config(&rate_limit));
        method_router = method_router.layer(from_fn_with_state(limiter, enforce_rate_limit));
    }

    match authorizer {
        Authorizer::NoSession => method_router.layer(from_fn(no_session)),
        Authorizer::UserLogin => method_router.layer(from_fn_with_state(state.clone(), user_login)),
    }
}

async fn dispatch(
    State(handle): State<RouteHandle>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    params: Option<Path<HashMap<String, String>>>,
    RawQuery(query): RawQuery,
    principal: Option<Extension<Principal>>,
    headers: HeaderMap,
    body: Bytes,
) -> FinalResponse {
    let principal = principal
        .map(|Extension(p)| p)
        .unwrap_or(Principal::NoSession);

    let (body, body_error) = parse_body(&headers, &body);
    let input = RequestInput {
        params: params
            .map(|Path(p)| p)
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
        query: query.map(|q| urlencoded_map(q.as_bytes())).unwrap_or_default(),
        body,
        headers: header_map(&headers),
    };

    let mut ctx = RequestContext::new(trace_id, principal, input);
    if let Some(error) = body_error {
        ctx.add_error(error);
    }

    drive(&handle.route, &mut ctx, &handle.state).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    Form,
    Ignored,
}

fn body_format(headers: &HeaderMap) -> BodyFormat {
    let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return BodyFormat::Ignored;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/json" => BodyFormat::Json,
        "application/x-www-form-urlencoded" => BodyFormat::Form,
        e if e.starts_with("application/") && e.ends_with("+json") => BodyFormat::Json,
        _ => BodyFormat::Ignored,
    }
}

/// JSON and form bodies are decoded; empty bodies and other content types read as `{}`
fn parse_body(headers: &HeaderMap, body: &Bytes) -> (Value, Option<HandlerError>) {
    if body.iter().all(u8::is_ascii_whitespace) {
        return (Value::Object(Map::new()), None);
    }

    match body_format(headers) {
        BodyFormat::Json => match serde_json::from_slice(body) {
            Ok(value) => (value, None),
            Err(e) => (
                Value::Object(Map::new()),
                Some(HandlerError::new(format!("Request body is not valid JSON: {}", e))),
            ),
        },
        BodyFormat::Form => (Value::Object(urlencoded_map(body)), None),
        BodyFormat::Ignored => (Value::Object(Map::new()), None),
    }
}

/// Decode `a=1&b=2`. Repeated keys and `key[]` collect into arrays.
fn urlencoded_map(input: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        let value = Value::String(value.into_owned());
        let (key, force_array) = match key.strip_suffix("[]") {
            Some(stripped) => (stripped.to_string(), true),
            None => (key.to_string(), false),
        };

        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                let value = if force_array { Value::Array(vec![value]) } else { value };
                map.insert(key, value);
            }
        }
    }
    map
}

fn header_map(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), Value::String(joined));
    }
    map
}

async fn serve_docs(State(document): State<Arc<Value>>) -> Json<Value> {
    Json(document.as_ref().clone())
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response()
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::OPTIONS,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-access-token"),
            header::AUTHORIZATION,
            HeaderName::from_static("platform"),
            HeaderName::from_static("version"),
            HeaderName::from_static("trace-id"),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn empty_body_reads_as_object() {
        let (value, error) = parse_body(&content_type("application/json"), &Bytes::from_static(b"  \n"));
        assert_eq!(value, json!({}));
        assert!(error.is_none());
    }

    #[test]
    fn invalid_json_body_is_an_error() {
        let (value, error) = parse_body(&content_type("application/json"), &Bytes::from_static(b"{not json"));
        assert_eq!(value, json!({}));
        assert!(error.unwrap().message.starts_with("Request body is not valid JSON"));
    }

    #[test]
    fn body_format_follows_content_type() {
        assert_eq!(body_format(&content_type("application/json; charset=utf-8")), BodyFormat::Json);
        assert_eq!(body_format(&content_type("application/vnd.api+json")), BodyFormat::Json);
        assert_eq!(body_format(&content_type("application/x-www-form-urlencoded")), BodyFormat::Form);
        assert_eq!(body_format(&content_type("text/plain")), BodyFormat::Ignored);
        assert_eq!(body_format(&HeaderMap::new()), BodyFormat::Ignored);
    }

    #[test]
    fn unparsed_content_types_read_as_object() {
        let (value, error) = parse_body(&content_type("text/plain"), &Bytes::from_static(b"{not json"));
        assert_eq!(value, json!({}));
        assert!(error.is_none());

        let (value, _) = parse_body(&HeaderMap::new(), &Bytes::from_static(b"{\"a\":1}"));
        assert_eq!(value, json!({}));
    }

    #[test]
    fn urlencoded_keys_collect_repeats() {
        let map = urlencoded_map(b"name=blue+pen&tag=a&tag=b&ids[]=7&note=%C3%A9");
        assert_eq!(
            Value::Object(map),
            json!({ "name": "blue pen", "tag": ["a", "b"], "ids": ["7"], "note": "é" })
        );
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers.insert("platform", HeaderValue::from_static("ios"));
        headers.insert("x-raw", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let map = header_map(&headers);
        assert_eq!(map["x-tag"], json!("a, b"));
        assert_eq!(map["platform"], json!("ios"));
        assert_eq!(map["x-raw"], json!("caf\u{fffd}"));
    }
}
