use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::database::{find_or_create_user, NewUser, User};
use crate::error::ConfigError;
use crate::pipeline::Principal;
use crate::state::AppState;
use crate::types::AuthLevel;

/// Pre-chain middleware selected from a route's auth level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorizer {
    NoSession,
    UserLogin,
}

/// Every auth level must map to a middleware; unmapped levels stop the load.
pub fn select_authorizer(route: &str, level: AuthLevel) -> Result<Authorizer, ConfigError> {
    match level {
        AuthLevel::NoSession => Ok(Authorizer::NoSession),
        AuthLevel::UserLogin => Ok(Authorizer::UserLogin),
        AuthLevel::AdminLogin => Err(ConfigError::UnmappedAuthLevel {
            route: route.to_string(),
            level,
        }),
    }
}

/// 401 with a plain-text body; bypasses the response envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRejection(pub String);

impl AuthRejection {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.0).into_response()
    }
}

/// Anonymous routes: attach the no-session principal and continue
pub async fn no_session(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(Principal::NoSession);
    next.run(request).await
}

/// Signed-in routes: verify the bearer token and attach the stored user
pub async fn user_login(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authenticate(&state, request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(Principal::User(user));
            next.run(request).await
        }
        Err(rejection) => {
            tracing::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), rejection.0);
            rejection.into_response()
        }
    }
}

/// Resolve the caller of a USER_LOGIN route, creating the user on first sign-in
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AuthRejection> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| AuthRejection::new("You are not authorized to access this resource"))?;

    let platform = header_value(headers, "platform")
        .ok_or_else(|| AuthRejection::new("You must provide a platform header"))?;
    if !state.is_allowed_platform(platform) {
        return Err(AuthRejection::new("You must provide a valid platform header"));
    }

    let version = header_value(headers, "version")
        .ok_or_else(|| AuthRejection::new("You must provide a version header"))?;

    let identity = state
        .identity
        .verify_token(token)
        .await
        .map_err(|e| AuthRejection::new(e.to_string()))?
        .ok_or_else(|| AuthRejection::new("Unauthorized"))?;

    let email = match identity.email.as_deref() {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => return Err(AuthRejection::new("Unauthorized")),
    };

    let new_user = NewUser {
        email,
        name: identity.name,
        image: identity.picture,
        version: version.to_string(),
        platform: platform.to_string(),
        firebase_uid: identity.uid,
    };

    let lookup = find_or_create_user(state.users.as_ref(), new_user)
        .await
        .map_err(|e| AuthRejection::new(e.to_string()))?;

    Ok(lookup.into_user())
}

/// Token from `Authorization: Bearer <token>`
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        identity, state_with, test_state, FailingIdentityProvider, FailingUserStore, MemoryUserStore,
        StaticIdentityProvider,
    };
    use axum::http::HeaderValue;
    use std::sync::Arc;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    fn state(store: Arc<MemoryUserStore>) -> AppState {
        test_state(
            store,
            StaticIdentityProvider::default()
                .with_token("good", identity("uid-1", "ada@example.com"))
                .with_token(
                    "no-email",
                    crate::identity::VerifiedIdentity {
                        uid: "uid-2".into(),
                        email: None,
                        name: None,
                        picture: None,
                    },
                ),
        )
    }

    async fn reject(pairs: &[(&'static str, &str)]) -> String {
        let state = state(Arc::new(MemoryUserStore::default()));
        authenticate(&state, &headers(pairs)).await.unwrap_err().0
    }

    #[test]
    fn admin_level_has_no_authorizer() {
        assert_eq!(select_authorizer("r", AuthLevel::NoSession).unwrap(), Authorizer::NoSession);
        assert_eq!(select_authorizer("r", AuthLevel::UserLogin).unwrap(), Authorizer::UserLogin);
        assert!(select_authorizer("r", AuthLevel::AdminLogin).is_err());
    }

    #[tokio::test]
    async fn checks_headers_in_order() {
        assert_eq!(reject(&[]).await, "You are not authorized to access this resource");
        assert_eq!(
            reject(&[("authorization", "Token good")]).await,
            "You are not authorized to access this resource"
        );
        assert_eq!(
            reject(&[("authorization", "Bearer good")]).await,
            "You must provide a platform header"
        );
        assert_eq!(
            reject(&[("authorization", "Bearer good"), ("platform", "web")]).await,
            "You must provide a valid platform header"
        );
        assert_eq!(
            reject(&[("authorization", "Bearer good"), ("platform", "ios")]).await,
            "You must provide a version header"
        );
    }

    #[tokio::test]
    async fn unknown_token_or_missing_email_is_unauthorized() {
        let base = [("platform", "android"), ("version", "1.0.0")];

        let mut pairs = base.to_vec();
        pairs.push(("authorization", "Bearer nope"));
        assert_eq!(reject(&pairs).await, "Unauthorized");

        let mut pairs = base.to_vec();
        pairs.push(("authorization", "Bearer no-email"));
        assert_eq!(reject(&pairs).await, "Unauthorized");
    }

    fn signed_in_headers() -> HeaderMap {
        headers(&[
            ("authorization", "Bearer good"),
            ("platform", "android"),
            ("version", "1.0.0"),
        ])
    }

    #[tokio::test]
    async fn provider_failure_text_is_the_rejection() {
        let store = Arc::new(MemoryUserStore::default());
        let state = state_with(store.clone(), Arc::new(FailingIdentityProvider));

        let rejection = authenticate(&state, &signed_in_headers()).await.unwrap_err();
        assert_eq!(rejection.0, "No signing keys available");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_failure_text_is_the_rejection() {
        let provider = StaticIdentityProvider::default().with_token("good", identity("uid-1", "ada@example.com"));
        let state = state_with(Arc::new(FailingUserStore), Arc::new(provider));

        let rejection = authenticate(&state, &signed_in_headers()).await.unwrap_err();
        assert_eq!(rejection.0, "Database is not connected.");
    }

    #[tokio::test]
    async fn first_sign_in_creates_user_then_reuses_it() {
        let store = Arc::new(MemoryUserStore::default());
        let state = state(store.clone());
        let headers = headers(&[
            ("authorization", "Bearer good"),
            ("platform", "android"),
            ("version", "2.1.0"),
        ]);

        let first = authenticate(&state, &headers).await.unwrap();
        assert_eq!(first.email, "ada@example.com");
        assert_eq!(first.platform.as_deref(), Some("android"));
        assert_eq!(first.version.as_deref(), Some("2.1.0"));
        assert_eq!(first.firebase_uid.as_deref(), Some("uid-1"));

        let second = authenticate(&state, &headers).await.unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(store.len(), 1);
    }
}
