pub mod firebase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use firebase::FirebaseIdentityProvider;

/// Identity asserted by a verified ID token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),

    #[error("No signing keys available")]
    NoKeys,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Verifies bearer tokens presented by mobile clients.
///
/// `Ok(None)` means the token cannot be attributed to any known signing key.
/// Tokens that fail verification and provider failures are errors; their text
/// is what the client sees.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<Option<VerifiedIdentity>, IdentityError>;
}
