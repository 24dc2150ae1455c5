//! Active issuer trust policy
//!
//! [`IssuerTrust`] is what request handlers hold: the immutable
//! configuration, the issuer registry built from it, and the verifier cache
//! pre-warmed for it. It is built once per load and shared behind an `Arc`;
//! a reload builds a new one and swaps it in whole.

use std::sync::Arc;

use crate::{
    cache::{CacheOptions, VerifierCache},
    config::FulcioConfig,
    discovery::OidcDiscovery,
    error::ConfigError,
    issuer::OidcIssuer,
    registry::IssuerRegistry,
    validation::validate_config,
    verifier::IdTokenVerifier,
};

/// Loaded configuration plus everything derived from it
pub struct IssuerTrust {
    config: Arc<FulcioConfig>,
    registry: IssuerRegistry,
    verifiers: VerifierCache,
}

impl IssuerTrust {
    /// Validate `config`, then derive the registry and pre-warm verifiers
    ///
    /// # Errors
    ///
    /// Fails if any issuer breaks a validation rule (before any discovery
    /// runs) or if discovery fails for any fixed issuer.
    pub async fn prepare(
        config: FulcioConfig,
        discovery: Arc<dyn OidcDiscovery>,
        options: CacheOptions,
    ) -> Result<Self, ConfigError> {
        validate_config(&config)?;

        let registry = IssuerRegistry::new(&config);
        let verifiers = VerifierCache::prewarm(&config, discovery, options).await?;

        Ok(Self { config: Arc::new(config), registry, verifiers })
    }

    /// Find the configuration governing `issuer_url`
    pub fn resolve_issuer(&self, issuer_url: &str) -> Option<OidcIssuer> {
        self.registry.resolve_issuer(issuer_url)
    }

    /// Get a verifier for `issuer_url`
    ///
    /// See [`VerifierCache::get`].
    pub async fn get_verifier(&self, issuer_url: &str) -> Option<Arc<IdTokenVerifier>> {
        self.verifiers.get(&self.registry, issuer_url).await
    }

    /// The configuration this policy was built from
    pub fn config(&self) -> &Arc<FulcioConfig> {
        &self.config
    }

    /// The verifier cache backing [`Self::get_verifier`]
    pub fn verifiers(&self) -> &VerifierCache {
        &self.verifiers
    }
}

impl std::fmt::Debug for IssuerTrust {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerTrust")
            .field("fixed_issuers", &self.config.oidc_issuers.len())
            .field("meta_issuers", &self.config.meta_issuers.len())
            .finish()
    }
}
