//! OpenAPI 3 document generated from the loaded route table.

use serde_json::{json, Map, Value};

use crate::routes::{router_path, Route, RouteTable};
use crate::types::AuthLevel;

// Tags left out of the mobile document
const EXCLUDED_TAGS: &[&str] = &["admin"];

pub fn build_document(table: &RouteTable) -> Value {
    let mut paths = Map::new();

    for route in table.routes() {
        if EXCLUDED_TAGS.contains(&route.tag()) {
            continue;
        }

        let entry = paths
            .entry(openapi_path(&route.config.path))
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(
                route.config.http_method.as_str().to_lowercase(),
                operation(route),
            );
        }
    }

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Mobile API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "API Documentation For Mobile Application",
        },
        "components": {
            "securitySchemes": {
                "USER_LOGIN": {
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT",
                    "description": "ID token from Google sign-in",
                }
            }
        },
        "paths": paths,
    })
}

/// `/v1/users/:id(\\d+)` → `/v1/users/{id}`
pub fn openapi_path(path: &str) -> String {
    router_path(path)
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `google-verify` → `Google Verify`
pub fn format_tag_name(tag: &str) -> String {
    tag.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite `"type": [T, "null"]` as `"type": T, "nullable": true`, recursively
pub fn to_openapi_schema(schema: &Value) -> Value {
    let mut schema = schema.clone();
    convert_nullable(&mut schema);
    schema
}

fn convert_nullable(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };

    let nullable_type = match map.get("type") {
        Some(Value::Array(types)) if types.iter().any(|t| t == "null") => {
            Some(types.iter().find(|t| *t != "null").cloned().unwrap_or(Value::Null))
        }
        _ => None,
    };
    if let Some(t) = nullable_type {
        if t.is_null() {
            map.remove("type");
        } else {
            map.insert("type".to_string(), t);
        }
        map.insert("nullable".to_string(), Value::Bool(true));
    }

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for property in properties.values_mut() {
            convert_nullable(property);
        }
    }

    match map.get_mut("items") {
        Some(Value::Array(items)) => items.iter_mut().for_each(convert_nullable),
        Some(items) => convert_nullable(items),
        None => {}
    }
}

fn security(level: AuthLevel) -> Value {
    match level {
        AuthLevel::UserLogin => json!([{ "USER_LOGIN": [] }]),
        AuthLevel::AdminLogin => json!([{ "ADMIN_LOGIN": [] }]),
        AuthLevel::NoSession => json!([]),
    }
}

fn global_headers() -> Vec<Value> {
    vec![
        json!({
            "name": "platform",
            "in": "header",
            "required": true,
            "schema": { "type": "string", "enum": ["android", "ios"], "example": "android" },
            "description": "Platform from which the request is made",
        }),
        json!({
            "name": "version",
            "in": "header",
            "required": true,
            "schema": { "type": "string", "example": "1.0.0" },
            "description": "Version of the client making the request",
        }),
    ]
}

fn operation(route: &Route) -> Value {
    let data_schema = route
        .response_schema()
        .map(|schema| to_openapi_schema(schema.source()))
        .unwrap_or_else(|| json!({ "type": "object" }));

    let mut operation = json!({
        "tags": [format_tag_name(route.tag())],
        "summary": format_tag_name(route.operation()),
        "security": security(route.config.auth_level),
        "responses": {
            "200": {
                "description": "Successful response",
                "content": { "application/json": { "schema": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean", "example": true },
                        "traceId": { "type": "string", "format": "uuid" },
                        "data": data_schema,
                    }
                }}}
            },
            "400": {
                "description": "Handled error response",
                "content": { "application/json": { "schema": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean", "example": false },
                        "traceId": { "type": "string", "format": "uuid" },
                        "errors": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "message": { "type": "string" },
                                    "code": { "type": "string" },
                                }
                            }
                        }
                    }
                }}}
            }
        }
    });

    let mut parameters = Vec::new();

    if let Some(schema) = route.request_schema() {
        let sections = schema.source().get("properties");
        let section = |name: &str| sections.and_then(|s| s.get(name));

        if let Some(params) = section("params") {
            parameters.extend(section_parameters(params, "path"));
        }
        if let Some(query) = section("query") {
            parameters.extend(section_parameters(query, "query"));
        }
        if let Some(body) = section("body") {
            let mut request_body = json!({
                "content": { "application/json": { "schema": to_openapi_schema(body) } }
            });
            if let Some(description) = body.get("description") {
                request_body["description"] = description.clone();
            }
            operation["requestBody"] = request_body;
        }
        if let Some(headers) = section("headers") {
            parameters.extend(section_parameters(headers, "header"));
        }
    }

    parameters.extend(global_headers());
    operation["parameters"] = Value::Array(parameters);

    if route.config.deprecated {
        operation["deprecated"] = Value::Bool(true);
    }

    operation
}

/// One parameter per property of a `params` / `query` / `headers` section
fn section_parameters(section: &Value, location: &str) -> Vec<Value> {
    let Some(Value::Object(properties)) = section.get("properties") else {
        return Vec::new();
    };
    let required: Vec<&str> = section
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, schema)| {
            let mut parameter = json!({
                "name": name,
                "in": location,
                "required": location == "path" || required.contains(&name.as_str()),
                "schema": to_openapi_schema(schema),
            });
            if let Some(description) = schema.get("description") {
                parameter["description"] = description.clone();
            }
            parameter
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{RouteConfig, RouteDescriptor, RouteRegistry};
    use crate::types::HttpMethod;

    #[test]
    fn paths_use_braces() {
        assert_eq!(openapi_path("/v1/users/:id(\\d+)/posts/:post"), "/v1/users/{id}/posts/{post}");
        assert_eq!(openapi_path("/application/health"), "/application/health");
    }

    #[test]
    fn tag_names_are_title_cased() {
        assert_eq!(format_tag_name("google-verify"), "Google Verify");
        assert_eq!(format_tag_name("application"), "Application");
    }

    #[test]
    fn nullable_types_are_converted() {
        let schema = json!({
            "type": "object",
            "properties": {
                "image": { "type": ["string", "null"] },
                "tags": { "type": "array", "items": { "type": ["integer", "null"] } }
            }
        });

        let converted = to_openapi_schema(&schema);
        assert_eq!(converted["properties"]["image"], json!({ "type": "string", "nullable": true }));
        assert_eq!(
            converted["properties"]["tags"]["items"],
            json!({ "type": "integer", "nullable": true })
        );
    }

    #[test]
    fn document_describes_routes() {
        let mut registry = RouteRegistry::new();
        registry
            .register(
                RouteDescriptor::new("users/get-user")
                    .config(RouteConfig::new(AuthLevel::UserLogin, HttpMethod::Get, "/v1/users/:id").deprecated())
                    .request_schema(json!({
                        "type": "object",
                        "properties": {
                            "params": { "type": "object", "properties": { "id": { "type": "integer" } } },
                            "query": {
                                "type": "object",
                                "properties": { "full": { "type": "boolean", "description": "Expand" } },
                                "required": ["full"]
                            }
                        }
                    }))
                    .response_schema(json!({ "type": "object", "properties": { "id": { "type": "integer" } } })),
            )
            .register(
                RouteDescriptor::new("admin/list")
                    .config(RouteConfig::new(AuthLevel::NoSession, HttpMethod::Get, "/admin/list")),
            );
        let table = registry.load().unwrap();

        let document = build_document(&table);
        let op = &document["paths"]["/v1/users/{id}"]["get"];

        assert_eq!(op["tags"], json!(["Users"]));
        assert_eq!(op["summary"], json!("Get User"));
        assert_eq!(op["security"], json!([{ "USER_LOGIN": [] }]));
        assert_eq!(op["deprecated"], json!(true));
        assert_eq!(
            op["responses"]["200"]["content"]["application/json"]["schema"]["properties"]["data"],
            json!({ "type": "object", "properties": { "id": { "type": "integer" } } })
        );

        let parameters = op["parameters"].as_array().unwrap();
        let names: Vec<&str> = parameters.iter().filter_map(|p| p["name"].as_str()).collect();
        assert_eq!(names, vec!["id", "full", "platform", "version"]);
        assert_eq!(parameters[1]["required"], json!(true));
        assert_eq!(parameters[1]["description"], json!("Expand"));

        assert!(document["paths"].get("/admin/list").is_none());
    }
}
