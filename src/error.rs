// Error types shared by the route loader and the request pipeline
use serde_json::Value;
use thiserror::Error;

use crate::types::{AuthLevel, HttpMethod};

/// Numeric error codes surfaced to clients as strings in the response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    Unauthorized = 401,
    RouteUndefined = 1001,
    HandlerNotValid = 1002,
    HandlerTypeNotValid = 1003,
    DatabaseNotConnected = 2001,
    DatabaseQueryError = 2002,
    UnprocessableEntityRequest = 4221,
    UnprocessableEntityResponse = 4222,
}

impl ErrorCode {
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Failure raised while handling a request.
///
/// Carries an optional code and an optional structured payload that are both
/// copied into the envelope's `errors` entry.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub code: Option<ErrorCode>,
    pub data: Option<Value>,
    expected: bool,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            data: None,
            expected: false,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// A single-row lookup that found nothing. Surfaces in the envelope but is
    /// never sent to the error reporter.
    pub fn query_single(message: impl Into<String>) -> Self {
        Self {
            message: format!("Query single error: {}.", message.into()),
            code: Some(ErrorCode::DatabaseQueryError),
            data: None,
            expected: true,
        }
    }

    pub fn is_expected(&self) -> bool {
        self.expected
    }
}

impl From<crate::database::DatabaseError> for HandlerError {
    fn from(err: crate::database::DatabaseError) -> Self {
        use crate::database::DatabaseError;

        match err {
            DatabaseError::QuerySingle(msg) => HandlerError::query_single(msg),
            DatabaseError::NotConnected => {
                HandlerError::new(err.to_string()).with_code(ErrorCode::DatabaseNotConnected)
            }
            other => HandlerError::new(other.to_string()).with_code(ErrorCode::DatabaseQueryError),
        }
    }
}

/// Broken route declarations. Raised while loading the route table; the
/// process must not start serving when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Route cannot be null/undefined: {0}")]
    RouteUndefined(String),

    #[error("Invalid handler, {artifact} for route '{route}': {reason}")]
    HandlerNotValid {
        route: String,
        artifact: &'static str,
        reason: String,
    },

    #[error("Route '{route}' declares auth level {} which has no authorization middleware", level.as_str())]
    UnmappedAuthLevel { route: String, level: AuthLevel },

    #[error("Route '{second}' duplicates {method} {path} already declared by '{first}'")]
    DuplicateRoute {
        method: HttpMethod,
        path: String,
        first: String,
        second: String,
    },

    #[error("Route '{route}' has invalid path '{path}': must start with '/'")]
    InvalidPath { route: String, path: String },
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::RouteUndefined(_) => ErrorCode::RouteUndefined,
            ConfigError::HandlerNotValid { .. } => ErrorCode::HandlerNotValid,
            ConfigError::UnmappedAuthLevel { .. } => ErrorCode::HandlerTypeNotValid,
            ConfigError::DuplicateRoute { .. } | ConfigError::InvalidPath { .. } => {
                ErrorCode::RouteUndefined
            }
        }
    }
}
