//! OIDC Discovery
//!
//! Fetches `{issuer}/.well-known/openid-configuration` and the JWKS it points
//! to. A verifier is only ever built from metadata whose `issuer` matches the
//! URL that was asked for.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use serde::{Deserialize, Serialize};

use crate::{error::DiscoveryError, trust_store::TrustStore};

/// Default bound on a single discovery call
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenID Connect Discovery document (the fields this crate uses)
#[derive(Debug, Clone, Serialize, Deserialize, bon::Builder)]
#[builder(on(String, into))]
pub struct DiscoveryDocument {
    /// Issuer identifier advertised by the provider
    pub issuer: String,

    /// JWKS URI for fetching public keys
    pub jwks_uri: String,

    /// Supported ID token signing algorithms
    #[serde(default)]
    #[builder(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

/// Everything needed to build a verifier for one issuer
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    /// Discovery document as served
    pub document: DiscoveryDocument,
    /// Key set fetched from `document.jwks_uri`
    pub jwks: JwkSet,
}

/// Source of provider metadata
///
/// [`HttpDiscoveryClient`] is the production implementation; tests supply
/// their own to count or fail discoveries.
#[async_trait]
pub trait OidcDiscovery: Send + Sync {
    /// Discover metadata for `issuer_url`
    async fn discover(&self, issuer_url: &str) -> Result<ProviderMetadata, DiscoveryError>;

    /// Fetch the current key set from a previously discovered `jwks_uri`
    async fn fetch_jwks(&self, jwks_uri: &str) -> Result<JwkSet, DiscoveryError>;
}

/// Discovery over HTTPS
pub struct HttpDiscoveryClient {
    http_client: reqwest::Client,
}

impl HttpDiscoveryClient {
    /// Create a discovery client trusting the built-in roots plus `trust_store`
    ///
    /// `request_timeout` bounds each HTTP request; callers add their own
    /// overall bound around [`OidcDiscovery::discover`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created (typically due to
    /// TLS configuration issues)
    pub fn new(
        trust_store: &TrustStore,
        request_timeout: Duration,
    ) -> Result<Self, DiscoveryError> {
        let builder = reqwest::Client::builder().timeout(request_timeout);
        let http_client = trust_store
            .apply(builder)
            .build()
            .map_err(|e| DiscoveryError::Client(e.to_string()))?;

        Ok(Self { http_client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, DiscoveryError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Http { url: url.to_string(), message: e.to_string() })?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    async fn fetch(&self, issuer_url: &str) -> Result<ProviderMetadata, DiscoveryError> {
        let discovery_url = discovery_url(issuer_url);

        let document: DiscoveryDocument = self
            .get(&discovery_url)
            .await?
            .json()
            .await
            .map_err(|e| DiscoveryError::InvalidDocument(e.to_string()))?;

        if document.jwks_uri.is_empty() {
            return Err(DiscoveryError::InvalidDocument("missing 'jwks_uri' field".to_string()));
        }
        if !issuer_matches(issuer_url, &document.issuer) {
            return Err(DiscoveryError::IssuerMismatch {
                expected: issuer_url.to_string(),
                actual: document.issuer,
            });
        }

        let jwks = self.get_jwks(&document.jwks_uri).await?;

        Ok(ProviderMetadata { document, jwks })
    }

    async fn get_jwks(&self, jwks_uri: &str) -> Result<JwkSet, DiscoveryError> {
        self.get(jwks_uri).await?.json().await.map_err(|e| DiscoveryError::Jwks(e.to_string()))
    }
}

#[async_trait]
impl OidcDiscovery for HttpDiscoveryClient {
    async fn discover(&self, issuer_url: &str) -> Result<ProviderMetadata, DiscoveryError> {
        tracing::info!(issuer = %issuer_url, "Fetching OIDC discovery document");

        let result = self.fetch(issuer_url).await;
        fulcio_observe::metrics::record_oidc_discovery(issuer_url, result.is_ok());

        if let Ok(metadata) = &result {
            tracing::info!(
                issuer = %issuer_url,
                jwks_uri = %metadata.document.jwks_uri,
                keys = metadata.jwks.keys.len(),
                "OIDC discovery successful"
            );
        }

        result
    }

    async fn fetch_jwks(&self, jwks_uri: &str) -> Result<JwkSet, DiscoveryError> {
        tracing::debug!(jwks_uri = %jwks_uri, "Fetching JWKS");
        self.get_jwks(jwks_uri).await
    }
}

/// Well-known discovery URL for an issuer
pub fn discovery_url(issuer_url: &str) -> String {
    format!("{}/.well-known/openid-configuration", issuer_url.trim_end_matches('/'))
}

// A single trailing slash difference is tolerated
fn issuer_matches(expected: &str, advertised: &str) -> bool {
    expected.trim_end_matches('/') == advertised.trim_end_matches('/')
}
