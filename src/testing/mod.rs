//! In-memory stand-ins for the database and identity provider, used by unit
//! and integration tests to drive the pipeline without external services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::database::{DatabaseError, NewUser, User, UserStore};
use crate::identity::{IdentityError, IdentityProvider, VerifiedIdentity};
use crate::pipeline::report::{ErrorReporter, TracingReporter};
use crate::state::AppState;

/// User store backed by a map keyed by email
#[derive(Debug)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
    next_id: AtomicI64,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryUserStore {
    pub fn len(&self) -> usize {
        self.users.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed a stored user directly, bypassing first-sign-in creation
    pub fn with_user(self, user: User) -> Self {
        self.users
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user.email.clone(), user);
        self
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, DatabaseError> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        if users.contains_key(&user.email) {
            return Ok(None);
        }

        let stored = User {
            user_id: self.next_id.fetch_add(1, Ordering::SeqCst),
            email: user.email.clone(),
            name: user.name,
            birth_date: None,
            gender: None,
            image: user.image,
            version: Some(user.version),
            platform: Some(user.platform),
            firebase_uid: Some(user.firebase_uid),
            is_onboarded: false,
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        };
        users.insert(user.email, stored.clone());
        Ok(Some(stored))
    }
}

/// Identity provider that accepts a fixed set of tokens
#[derive(Debug, Default, Clone)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, VerifiedIdentity>,
}

impl StaticIdentityProvider {
    pub fn with_token(mut self, token: &str, identity: VerifiedIdentity) -> Self {
        self.tokens.insert(token.to_string(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<Option<VerifiedIdentity>, IdentityError> {
        Ok(self.tokens.get(token).cloned())
    }
}

/// User store that is never reachable
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingUserStore;

#[async_trait]
impl UserStore for FailingUserStore {
    async fn find_user_by_email(&self, _email: &str) -> Result<Option<User>, DatabaseError> {
        Err(DatabaseError::NotConnected)
    }

    async fn insert_user(&self, _user: NewUser) -> Result<Option<User>, DatabaseError> {
        Err(DatabaseError::NotConnected)
    }
}

/// Identity provider whose signing keys never load
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingIdentityProvider;

#[async_trait]
impl IdentityProvider for FailingIdentityProvider {
    async fn verify_token(&self, _token: &str) -> Result<Option<VerifiedIdentity>, IdentityError> {
        Err(IdentityError::NoKeys)
    }
}

/// Identity with every optional claim present
pub fn identity(uid: &str, email: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        name: Some("Test User".to_string()),
        picture: None,
    }
}

/// Application state wired to the given fakes, allowing `android` and `ios`
pub fn test_state(users: Arc<MemoryUserStore>, identity: StaticIdentityProvider) -> AppState {
    state_with(users, Arc::new(identity))
}

/// Application state over any store and provider
pub fn state_with(users: Arc<dyn UserStore>, identity: Arc<dyn IdentityProvider>) -> AppState {
    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);
    AppState::new(
        users,
        identity,
        reporter,
        vec!["android".to_string(), "ios".to_string()],
    )
}
