//! JSON Schema validation for request and response payloads.
//!
//! Schemas are compiled once when the route table is loaded. Before a value is
//! validated it is prepared in place: declared `default`s are filled into
//! objects and scalars are coerced towards the declared `type`
//! (`"42"` → `42`, `"true"` → `true`, `7` → `"7"`), so handlers downstream see
//! the normalized value. Preparation follows `properties` and `items`; it does
//! not descend through `$ref` or the combinators.

use std::sync::Arc;

use jsonschema::{Draft, Validator};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema must be a JSON object")]
    NotAnObject,

    #[error("schema does not compile: {0}")]
    Invalid(String),
}

/// One failed schema constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub instance_path: String,
    pub schema_path: String,
    pub message: String,
}

/// A schema compiled for repeated validation. Cloning shares the compiled form.
#[derive(Clone)]
pub struct CompiledSchema {
    source: Arc<Value>,
    validator: Arc<Validator>,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").field("source", &self.source).finish()
    }
}

impl CompiledSchema {
    pub fn compile(schema: Value) -> Result<Self, SchemaError> {
        if !schema.is_object() {
            return Err(SchemaError::NotAnObject);
        }

        let mut options = jsonschema::options();
        options.with_draft(Draft::Draft7);
        options.should_validate_formats(true);

        let validator = options
            .build(&schema)
            .map_err(|e| SchemaError::Invalid(e.to_string()))?;

        Ok(Self {
            source: Arc::new(schema),
            validator: Arc::new(validator),
        })
    }

    /// The schema document as declared
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Fill defaults, coerce scalars, then validate.
    pub fn validate(&self, value: &mut Value) -> Result<(), Vec<Violation>> {
        prepare(&self.source, value);

        let violations: Vec<Violation> = self
            .validator
            .iter_errors(value)
            .map(|e| {
                let instance_path = e.instance_path.to_string();
                let message = if instance_path.is_empty() {
                    e.to_string()
                } else {
                    format!("{} {}", instance_path, e)
                };
                Violation {
                    instance_path,
                    schema_path: e.schema_path.to_string(),
                    message,
                }
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn prepare(schema: &Value, value: &mut Value) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    let types = declared_types(schema);
    if !types.is_empty() {
        coerce(value, &types);
    }

    match value {
        Value::Object(map) => {
            if let Some(Value::Object(properties)) = schema.get("properties") {
                for (key, property) in properties {
                    if !map.contains_key(key) {
                        if let Some(default) = property.get("default") {
                            map.insert(key.clone(), default.clone());
                        }
                    }
                    if let Some(child) = map.get_mut(key) {
                        prepare(property, child);
                    }
                }
            }
        }
        Value::Array(items) => match schema.get("items") {
            Some(Value::Array(tuple)) => {
                for (item, item_schema) in items.iter_mut().zip(tuple) {
                    prepare(item_schema, item);
                }
            }
            Some(item_schema) => {
                for item in items.iter_mut() {
                    prepare(item_schema, item);
                }
            }
            None => {}
        },
        _ => {}
    }
}

fn declared_types(schema: &Map<String, Value>) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn coerce(value: &mut Value, types: &[&str]) {
    if types.iter().any(|t| matches_type(value, t)) {
        return;
    }
    for t in types {
        if let Some(coerced) = coerce_to(value, t) {
            *value = coerced;
            return;
        }
    }
}

fn matches_type(value: &Value, t: &str) -> bool {
    match t {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => is_integer(value),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn coerce_to(value: &Value, t: &str) -> Option<Value> {
    match (t, value) {
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        ("string", Value::Null) => Some(Value::String(String::new())),

        ("number", Value::String(s)) => parse_number(s),
        ("integer", Value::String(s)) => parse_number(s).filter(is_integer),
        ("number" | "integer", Value::Bool(b)) => Some(Value::from(u8::from(*b))),
        ("number" | "integer", Value::Null) => Some(Value::from(0)),

        ("boolean", Value::String(s)) if s == "true" => Some(Value::Bool(true)),
        ("boolean", Value::String(s)) if s == "false" => Some(Value::Bool(false)),
        ("boolean", Value::Number(n)) if n.as_f64() == Some(1.0) => Some(Value::Bool(true)),
        ("boolean", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Bool(false)),
        ("boolean", Value::Null) => Some(Value::Bool(false)),

        ("null", Value::String(s)) if s.is_empty() => Some(Value::Null),
        ("null", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Null),
        ("null", Value::Bool(false)) => Some(Value::Null),

        _ => None,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_schema() -> CompiledSchema {
        CompiledSchema::compile(json!({
            "type": "object",
            "properties": {
                "body": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "age": { "type": "integer" },
                        "active": { "type": "boolean", "default": true },
                        "tags": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["name"]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn rejects_non_object_schema() {
        assert!(matches!(CompiledSchema::compile(json!("string")), Err(SchemaError::NotAnObject)));
    }

    #[test]
    fn rejects_invalid_schema() {
        assert!(matches!(
            CompiledSchema::compile(json!({ "type": 12 })),
            Err(SchemaError::Invalid(_))
        ));
    }

    #[test]
    fn coerces_scalars_and_fills_defaults() {
        let schema = body_schema();
        let mut value = json!({ "body": { "name": 7, "age": "42", "tags": [1, true] } });

        schema.validate(&mut value).unwrap();

        assert_eq!(value["body"]["name"], json!("7"));
        assert_eq!(value["body"]["age"], json!(42));
        assert_eq!(value["body"]["active"], json!(true));
        assert_eq!(value["body"]["tags"], json!(["1", "true"]));
    }

    #[test]
    fn reports_missing_required_field() {
        let schema = body_schema();
        let mut value = json!({ "body": { "age": 3 } });

        let violations = schema.validate(&mut value).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].instance_path, "/body");
        assert!(violations[0].message.contains("name"));
        assert!(violations[0].message.starts_with("/body "));
    }

    #[test]
    fn leaves_uncoercible_values_for_the_validator() {
        let schema = body_schema();
        let mut value = json!({ "body": { "name": "x", "age": "forty" } });

        let violations = schema.validate(&mut value).unwrap_err();
        assert_eq!(violations[0].instance_path, "/body/age");
        assert_eq!(value["body"]["age"], json!("forty"));
    }

    #[test]
    fn nullable_types_accept_null() {
        let schema = CompiledSchema::compile(json!({
            "type": "object",
            "properties": { "image": { "type": ["string", "null"] } }
        }))
        .unwrap();

        let mut value = json!({ "image": null });
        assert!(schema.validate(&mut value).is_ok());
        assert_eq!(value["image"], Value::Null);
    }

    #[test]
    fn coerces_integer_strings_only_when_whole() {
        assert_eq!(coerce_to(&json!("3"), "integer"), Some(json!(3)));
        assert_eq!(coerce_to(&json!("3.5"), "integer"), None);
        assert_eq!(coerce_to(&json!("3.5"), "number"), Some(json!(3.5)));
        assert_eq!(coerce_to(&json!(""), "number"), None);
        assert_eq!(coerce_to(&json!(0), "boolean"), Some(json!(false)));
    }
}
