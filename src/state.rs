use std::sync::Arc;

use crate::database::UserStore;
use crate::identity::IdentityProvider;
use crate::pipeline::ErrorReporter;

/// Shared services handed to authorizers and executors
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub allowed_platforms: Arc<[String]>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
        reporter: Arc<dyn ErrorReporter>,
        allowed_platforms: Vec<String>,
    ) -> Self {
        Self {
            users,
            identity,
            reporter,
            allowed_platforms: allowed_platforms.into(),
        }
    }

    pub fn is_allowed_platform(&self, platform: &str) -> bool {
        self.allowed_platforms.iter().any(|p| p == platform)
    }
}
