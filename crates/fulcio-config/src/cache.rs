//! Verifier cache
//!
//! Two tiers hold [`IdTokenVerifier`] handles:
//!
//! ```text
//! issuer URL → fixed map (pre-warmed at load, never evicted)
//!            → bounded cache (meta-issuer matches, TinyLFU admission, LRU eviction)
//!            → miss? resolve via registry
//!                    → unknown issuer: None, no network
//!                    → discovery under timeout → insert into bounded cache
//! ```
//!
//! Lazy discovery failures are logged and reported as a miss. Nothing is
//! cached on failure, so the next lookup for the same URL tries again.
//! Concurrent misses for one URL may each run discovery; the last insert wins.

use std::{collections::HashMap, sync::Arc, time::Duration};

use moka::future::Cache;

use crate::{
    config::FulcioConfig,
    discovery::{DEFAULT_DISCOVERY_TIMEOUT, OidcDiscovery, ProviderMetadata},
    error::{ConfigError, DiscoveryError},
    registry::IssuerRegistry,
    verifier::{DEFAULT_KEY_REFRESH_INTERVAL, IdTokenVerifier},
};

/// Default number of meta-issuer verifiers kept in the bounded tier
pub const DEFAULT_META_VERIFIER_CAPACITY: u64 = 100;

/// Tuning for a [`VerifierCache`]
#[derive(Debug, Clone, Copy, bon::Builder)]
pub struct CacheOptions {
    /// Upper bound on one discovery call
    #[builder(default = DEFAULT_DISCOVERY_TIMEOUT)]
    pub discovery_timeout: Duration,

    /// Maximum number of meta-issuer verifiers held at once
    #[builder(default = DEFAULT_META_VERIFIER_CAPACITY)]
    pub meta_capacity: u64,

    /// Minimum time between JWKS refetches by one verifier
    #[builder(default = DEFAULT_KEY_REFRESH_INTERVAL)]
    pub key_refresh_interval: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Verifier handles for fixed and meta issuers
pub struct VerifierCache {
    fixed: HashMap<String, Arc<IdTokenVerifier>>,
    meta: Cache<String, Arc<IdTokenVerifier>>,
    discovery: Arc<dyn OidcDiscovery>,
    discovery_timeout: Duration,
    key_refresh_interval: Duration,
}

impl VerifierCache {
    /// Build the cache, running discovery for every fixed issuer
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Discovery`] naming the first fixed issuer whose
    /// discovery failed. No cache is produced in that case.
    pub async fn prewarm(
        config: &FulcioConfig,
        discovery: Arc<dyn OidcDiscovery>,
        options: CacheOptions,
    ) -> Result<Self, ConfigError> {
        let mut cache = Self {
            fixed: HashMap::with_capacity(config.oidc_issuers.len()),
            meta: Cache::builder().max_capacity(options.meta_capacity).build(),
            discovery,
            discovery_timeout: options.discovery_timeout,
            key_refresh_interval: options.key_refresh_interval,
        };

        for (issuer_url, issuer) in &config.oidc_issuers {
            let metadata = cache.discover(issuer_url).await.map_err(|source| {
                ConfigError::Discovery { issuer: issuer_url.clone(), source }
            })?;

            let verifier = cache.verifier(issuer_url, &issuer.client_id, metadata);
            cache.fixed.insert(issuer_url.clone(), Arc::new(verifier));
        }

        tracing::debug!(fixed_issuers = cache.fixed.len(), "Verifier cache pre-warmed");

        Ok(cache)
    }

    /// Get a verifier for `issuer_url`, discovering it if necessary
    ///
    /// Returns `None` when the issuer is not configured or its discovery
    /// failed or timed out.
    pub async fn get(
        &self,
        registry: &IssuerRegistry,
        issuer_url: &str,
    ) -> Option<Arc<IdTokenVerifier>> {
        if let Some(verifier) = self.fixed.get(issuer_url) {
            fulcio_observe::metrics::record_verifier_cache_lookup("fixed", true);
            return Some(Arc::clone(verifier));
        }

        if let Some(verifier) = self.meta.get(issuer_url).await {
            fulcio_observe::metrics::record_verifier_cache_lookup("meta", true);
            return Some(verifier);
        }
        fulcio_observe::metrics::record_verifier_cache_lookup("meta", false);

        let Some(issuer) = registry.resolve_issuer(issuer_url) else {
            tracing::debug!(issuer = %issuer_url, "No issuer configuration matches");
            return None;
        };

        let metadata = match self.discover(issuer_url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(issuer = %issuer_url, error = %e, "OIDC discovery failed");
                return None;
            },
        };

        let verifier = Arc::new(self.verifier(issuer_url, &issuer.client_id, metadata));
        self.meta.insert(issuer_url.to_string(), Arc::clone(&verifier)).await;

        tracing::debug!(issuer = %issuer_url, "Cached verifier for meta issuer");

        Some(verifier)
    }

    /// Number of pre-warmed fixed verifiers
    pub fn fixed_len(&self) -> usize {
        self.fixed.len()
    }

    /// Number of meta-issuer verifiers held, after pending evictions are applied
    pub async fn meta_len(&self) -> u64 {
        self.meta.run_pending_tasks().await;
        self.meta.entry_count()
    }

    /// Whether a meta-issuer verifier for `issuer_url` is currently cached
    pub fn contains_meta(&self, issuer_url: &str) -> bool {
        self.meta.contains_key(issuer_url)
    }

    fn verifier(
        &self,
        issuer_url: &str,
        client_id: &str,
        metadata: ProviderMetadata,
    ) -> IdTokenVerifier {
        IdTokenVerifier::new(issuer_url, client_id, metadata)
            .with_key_refresh(Arc::clone(&self.discovery), self.key_refresh_interval)
    }

    async fn discover(&self, issuer_url: &str) -> Result<ProviderMetadata, DiscoveryError> {
        tokio::time::timeout(self.discovery_timeout, self.discovery.discover(issuer_url))
            .await
            .map_err(|_| DiscoveryError::Timeout(self.discovery_timeout))?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use jsonwebtoken::jwk::JwkSet;

    use super::*;
    use crate::discovery::DiscoveryDocument;

    #[derive(Default)]
    struct CountingDiscovery {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OidcDiscovery for CountingDiscovery {
        async fn discover(&self, issuer_url: &str) -> Result<ProviderMetadata, DiscoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderMetadata {
                document: DiscoveryDocument::builder()
                    .issuer(issuer_url)
                    .jwks_uri(format!("{}/jwks", issuer_url))
                    .build(),
                jwks: JwkSet { keys: vec![] },
            })
        }

        async fn fetch_jwks(&self, _jwks_uri: &str) -> Result<JwkSet, DiscoveryError> {
            Ok(JwkSet { keys: vec![] })
        }
    }

    #[test]
    fn test_cache_options_defaults() {
        let options = CacheOptions::default();
        assert_eq!(options.discovery_timeout, Duration::from_secs(10));
        assert_eq!(options.meta_capacity, 100);
    }

    #[tokio::test]
    async fn test_prewarm_discovers_each_fixed_issuer_once() {
        let config = FulcioConfig::default();
        let discovery = Arc::new(CountingDiscovery::default());
        let cache =
            VerifierCache::prewarm(&config, discovery.clone(), CacheOptions::default())
                .await
                .unwrap();

        assert_eq!(cache.fixed_len(), 3);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 3);

        let registry = IssuerRegistry::new(&config);
        let verifier = cache.get(&registry, "https://accounts.google.com").await.unwrap();
        assert_eq!(verifier.client_id(), "sigstore");
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unknown_issuer_does_not_discover() {
        let config = FulcioConfig::default();
        let discovery = Arc::new(CountingDiscovery::default());
        let cache =
            VerifierCache::prewarm(&config, discovery.clone(), CacheOptions::default())
                .await
                .unwrap();
        let registry = IssuerRegistry::new(&config);

        assert!(cache.get(&registry, "https://attacker.example").await.is_none());
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 3);
        assert!(!cache.contains_meta("https://attacker.example"));
    }
}
