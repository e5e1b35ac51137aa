use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::IdentityConfig;
use crate::identity::{IdentityError, IdentityProvider, VerifiedIdentity};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

// Unknown key ids trigger a refetch at most this often
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

struct CachedKeys {
    fetched_at: Instant,
    keys: JwkSet,
}

/// Verifies Firebase ID tokens as RS256 JWTs against Google's published keys
pub struct FirebaseIdentityProvider {
    client: reqwest::Client,
    project_id: String,
    jwks_url: String,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        if config.project_id.trim().is_empty() {
            return Err(IdentityError::NotConfigured("FIREBASE_ADMIN_PROJECT_ID"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            project_id: config.project_id.clone(),
            jwks_url: config.jwks_url.clone(),
            cache_ttl: Duration::from_secs(config.key_cache_secs),
            cache: RwLock::new(None),
        })
    }

    /// Fetch the key set and replace the cache
    pub async fn refresh_keys(&self) -> Result<usize, IdentityError> {
        let keys: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if keys.keys.is_empty() {
            return Err(IdentityError::NoKeys);
        }

        let count = keys.keys.len();
        *self.cache.write().await = Some(CachedKeys {
            fetched_at: Instant::now(),
            keys,
        });

        tracing::debug!("Loaded {} signing keys from {}", count, self.jwks_url);
        Ok(count)
    }

    async fn decoding_key(&self, kid: &str) -> Result<Option<DecodingKey>, IdentityError> {
        let stale = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                None => true,
                Some(cached) => {
                    let age = cached.fetched_at.elapsed();
                    if age < self.cache_ttl {
                        if let Some(jwk) = cached.keys.find(kid) {
                            return Ok(Some(DecodingKey::from_jwk(jwk)?));
                        }
                    }
                    age >= MIN_REFETCH_INTERVAL || age >= self.cache_ttl
                }
            }
        };

        if !stale {
            return Ok(None);
        }

        self.refresh_keys().await?;

        let cache = self.cache.read().await;
        match cache.as_ref().and_then(|cached| cached.keys.find(kid)) {
            Some(jwk) => Ok(Some(DecodingKey::from_jwk(jwk)?)),
            None => Ok(None),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("{}{}", ISSUER_PREFIX, self.project_id)]);
        validation
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<Option<VerifiedIdentity>, IdentityError> {
        let header = decode_header(token)?;
        let Some(kid) = header.kid else {
            return Ok(None);
        };

        let Some(key) = self.decoding_key(&kid).await? else {
            tracing::warn!("Token signed with unknown key id {}", kid);
            return Ok(None);
        };

        let data = decode::<FirebaseClaims>(token, &key, &self.validation())?;
        let claims = data.claims;

        Ok(Some(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        }))
    }
}
