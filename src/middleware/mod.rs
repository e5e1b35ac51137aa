pub mod auth;
pub mod rate_limit;
pub mod trace;

pub use auth::{authenticate, no_session, select_authorizer, user_login, AuthRejection, Authorizer};
pub use rate_limit::{enforce_rate_limit, RateLimiter};
pub use trace::{inject_trace_id, TraceId, TRACE_ID_HEADER};
