use std::time::Instant;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::database::User;
use crate::error::{ErrorCode, HandlerError};

/// Which schema check failed, deciding the code every error in the envelope carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Request,
    Response,
}

impl SchemaKind {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            SchemaKind::Request => ErrorCode::UnprocessableEntityRequest,
            SchemaKind::Response => ErrorCode::UnprocessableEntityResponse,
        }
    }
}

/// Caller identity attached by the route's authorizer
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    NoSession,
    User(User),
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::User(user) => Some(user),
            Principal::NoSession => None,
        }
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Principal::NoSession => json!({ "noSession": true }).serialize(serializer),
            Principal::User(user) => user.serialize(serializer),
        }
    }
}

/// The parts of the HTTP request that schemas validate and executors read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestInput {
    pub params: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: Value,
    pub headers: Map<String, Value>,
}

impl Default for RequestInput {
    fn default() -> Self {
        Self {
            params: Map::new(),
            query: Map::new(),
            body: Value::Object(Map::new()),
            headers: Map::new(),
        }
    }
}

impl RequestInput {
    /// `{params, query, body, headers}` as one document for request schemas
    pub fn to_value(&self) -> Value {
        json!({
            "params": self.params,
            "query": self.query,
            "body": self.body,
            "headers": self.headers,
        })
    }

    /// Take back a document produced by [`RequestInput::to_value`] after
    /// coercion and default filling. Sections that lost their shape are kept.
    pub fn replace_from(&mut self, value: Value) {
        let Value::Object(mut sections) = value else {
            return;
        };
        if let Some(Value::Object(params)) = sections.remove("params") {
            self.params = params;
        }
        if let Some(Value::Object(query)) = sections.remove("query") {
            self.query = query;
        }
        if let Some(body) = sections.remove("body") {
            self.body = body;
        }
        if let Some(Value::Object(headers)) = sections.remove("headers") {
            self.headers = headers;
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(Value::as_str)
    }
}

/// Per-request state flowing through the handler chain
#[derive(Debug)]
pub struct RequestContext {
    // Request identity
    pub trace_id: String,
    pub principal: Principal,
    pub input: RequestInput,

    // Pending response, written by the executor step
    pub status: Option<u16>,
    pub data: Option<Value>,

    // Error accumulation
    errors: Vec<HandlerError>,
    schema_kind: Option<SchemaKind>,

    pub started_at: Instant,
}

impl RequestContext {
    pub fn new(trace_id: impl Into<String>, principal: Principal, input: RequestInput) -> Self {
        Self {
            trace_id: trace_id.into(),
            principal,
            input,
            status: None,
            data: None,
            errors: Vec::new(),
            schema_kind: None,
            started_at: Instant::now(),
        }
    }

    /// The signed-in user, when the route requires one
    pub fn user(&self) -> Option<&User> {
        self.principal.user()
    }

    pub fn add_error(&mut self, error: HandlerError) {
        self.errors.push(error);
    }

    /// Record schema violations and remember which check produced them
    pub fn add_schema_errors(&mut self, kind: SchemaKind, errors: impl IntoIterator<Item = HandlerError>) {
        self.schema_kind = Some(kind);
        self.errors.extend(errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[HandlerError] {
        &self.errors
    }

    pub fn schema_kind(&self) -> Option<SchemaKind> {
        self.schema_kind
    }

    pub fn set_response(&mut self, status: u16, data: Value) {
        self.status = Some(status);
        self.data = Some(data);
    }

    /// Code reported for `error` in the envelope
    pub fn error_code(&self, error: &HandlerError) -> String {
        match (self.schema_kind, error.code) {
            (Some(kind), _) => kind.error_code().to_string(),
            (None, Some(code)) => code.to_string(),
            (None, None) => String::new(),
        }
    }
}
