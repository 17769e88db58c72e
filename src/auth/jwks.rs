/// External identity provider tokens
///
/// The provider publishes its signing keys as a JWKS document. Keys are
/// cached for a configurable time; a token signed with a `kid` the cache
/// does not know forces one refresh before the token is rejected. Forced
/// refreshes are spaced at least [`MIN_REFRESH_INTERVAL`] apart.
use std::{
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::Deserialize;

use super::AuthError;
use crate::config::ExternalIdentityConfig;

/// Source of the provider's published key set
#[async_trait]
pub trait KeySetProvider: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set over HTTPS
pub struct HttpKeySetProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpKeySetProvider {
    pub fn new(url: impl Into<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl KeySetProvider for HttpKeySetProvider {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!("🔑 Fetching JWKS from {}", self.url);
        self.client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))
    }
}

/// Fixed key set, for providers configured out of band and for tests
pub struct StaticKeySetProvider {
    keys: JwkSet,
}

impl StaticKeySetProvider {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeySetProvider for StaticKeySetProvider {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        Ok(self.keys.clone())
    }
}

/// Shortest gap between two fetches of the key set
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Claims TaskFlow reads from an external token
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Verifies tokens issued by the external identity provider
pub struct ExternalTokenValidator {
    provider: Arc<dyn KeySetProvider>,
    cache: ArcSwapOption<CachedKeys>,
    /// Held while fetching; remembers when the last fetch started
    refresh: tokio::sync::Mutex<Option<Instant>>,
    min_refresh_interval: Duration,
    cache_ttl: Duration,
    issuer: Option<String>,
    audience: Option<String>,
    algorithms: Vec<Algorithm>,
}

impl ExternalTokenValidator {
    pub fn new(provider: Arc<dyn KeySetProvider>, config: &ExternalIdentityConfig) -> Self {
        let algorithms = config
            .algorithms
            .iter()
            .filter_map(|name| match Algorithm::from_str(name.trim()) {
                Ok(alg) => Some(alg),
                Err(_) => {
                    tracing::warn!("⚠️ Ignoring unknown external token algorithm '{}'", name);
                    None
                }
            })
            .collect();

        Self {
            provider,
            cache: ArcSwapOption::empty(),
            refresh: tokio::sync::Mutex::new(None),
            min_refresh_interval: MIN_REFRESH_INTERVAL,
            cache_ttl: Duration::from_secs(config.jwks_cache_secs),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            algorithms,
        }
    }

    /// Validator backed by the configured JWKS URL; `None` when federation is off
    pub fn from_config(config: &ExternalIdentityConfig) -> Result<Option<Self>, AuthError> {
        let Some(url) = config.jwks_url.as_deref() else {
            return Ok(None);
        };
        let provider = HttpKeySetProvider::new(url)?;
        tracing::info!("🔐 External identity provider keys: {}", url);
        Ok(Some(Self::new(Arc::new(provider), config)))
    }

    pub async fn validate(&self, token: &str) -> Result<ExternalClaims, AuthError> {
        let header = decode_header(token)?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::AlgorithmRejected(format!("{:?}", header.alg)));
        }

        let key = self.key_for(header.kid.as_deref()).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<ExternalClaims>(token, &key, &validation)?.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".into()));
        }
        Ok(claims)
    }

    async fn key_for(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        if let Some(cached) = self.cache.load_full() {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                if let Some(jwk) = find_key(&cached.keys, kid) {
                    return Ok(DecodingKey::from_jwk(jwk)?);
                }
            }
        }

        let keys = self.refresh(kid).await?;
        let jwk = find_key(&keys.keys, kid)
            .ok_or_else(|| AuthError::UnknownKey(kid.unwrap_or_default().to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }

    /// Refetch the key set unless a concurrent refresh already brought in `kid`
    ///
    /// Within the refresh interval the current keys are returned as they are,
    /// so tokens with made-up `kid`s cannot drive fetches.
    async fn refresh(&self, kid: Option<&str>) -> Result<Arc<CachedKeys>, AuthError> {
        let mut last_fetch = self.refresh.lock().await;
        let cached = self.cache.load_full();
        if let Some(cached) = &cached {
            if cached.fetched_at.elapsed() < self.cache_ttl && find_key(&cached.keys, kid).is_some() {
                return Ok(cached.clone());
            }
        }

        if let Some(at) = *last_fetch {
            if at.elapsed() < self.min_refresh_interval {
                tracing::debug!("🔑 Key set refreshed {:?} ago, not refetching", at.elapsed());
                return cached.ok_or_else(|| {
                    AuthError::JwksFetch("previous fetch failed, retrying later".into())
                });
            }
        }

        *last_fetch = Some(Instant::now());
        let keys = self.provider.fetch().await?;
        tracing::info!("🔑 Loaded {} external signing key(s)", keys.keys.len());
        let cached = Arc::new(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        self.cache.store(Some(cached.clone()));
        Ok(cached)
    }
}

/// Key by `kid`; a token without one may only use a single-key set
fn find_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => keys.find(kid),
        None if keys.keys.len() == 1 => keys.keys.first(),
        None => None,
    }
}
