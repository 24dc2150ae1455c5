//! Issuer configuration document
//!
//! The document is JSON:
//!
//! ```json
//! {
//!   "OIDCIssuers": {
//!     "https://accounts.google.com": { "ClientID": "sigstore", "Type": "email" }
//!   },
//!   "MetaIssuers": {
//!     "https://oidc.eks.*.amazonaws.com/id/*": { "ClientID": "sigstore", "Type": "kubernetes" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    issuer::{IssuerType, OidcIssuer},
    registry::IssuerRegistry,
    validation::validate_config,
};

/// Issuer URL of the in-cluster Kubernetes API server
pub const KUBERNETES_ISSUER_URL: &str = "https://kubernetes.default.svc";

/// Client ID shared by the built-in issuers
pub const DEFAULT_CLIENT_ID: &str = "sigstore";

/// Immutable issuer trust policy
///
/// Both maps are ordered, so meta-issuer templates are always tried in
/// ascending lexicographic order of their template string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulcioConfig {
    /// Exact issuer URL to issuer configuration
    #[serde(rename = "OIDCIssuers", default)]
    pub oidc_issuers: BTreeMap<String, OidcIssuer>,

    /// Templated issuer URL to issuer configuration
    ///
    /// Used to match many issuers that share a hosting pattern, such as EKS
    /// or GKE clusters, without listing each one.
    #[serde(rename = "MetaIssuers", default)]
    pub meta_issuers: BTreeMap<String, OidcIssuer>,
}

impl Default for FulcioConfig {
    fn default() -> Self {
        let defaults = [
            OidcIssuer::builder()
                .issuer_url("https://oauth2.sigstore.dev/auth")
                .client_id(DEFAULT_CLIENT_ID)
                .issuer_type(IssuerType::Email)
                .issuer_claim("$.federated_claims.connector_id".to_string())
                .build(),
            OidcIssuer::builder()
                .issuer_url("https://accounts.google.com")
                .client_id(DEFAULT_CLIENT_ID)
                .issuer_type(IssuerType::Email)
                .build(),
            OidcIssuer::builder()
                .issuer_url("https://token.actions.githubusercontent.com")
                .client_id(DEFAULT_CLIENT_ID)
                .issuer_type(IssuerType::GithubWorkflow)
                .build(),
        ];

        Self {
            oidc_issuers: defaults.into_iter().map(|iss| (iss.issuer_url.clone(), iss)).collect(),
            meta_issuers: BTreeMap::new(),
        }
    }
}

impl FulcioConfig {
    /// Parse and validate a configuration document
    ///
    /// Fixed issuers without an `IssuerURL` take it from their map key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown issuer
    /// types, and [`ConfigError::Validation`] for rule violations.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let mut config: FulcioConfig = serde_json::from_slice(bytes)?;
        config.normalize();
        validate_config(&config)?;
        Ok(config)
    }

    fn normalize(&mut self) {
        for (url, issuer) in self.oidc_issuers.iter_mut() {
            if issuer.issuer_url.is_empty() {
                issuer.issuer_url = url.clone();
            }
        }
        for (template, issuer) in self.meta_issuers.iter_mut() {
            if issuer.issuer_url.is_empty() {
                issuer.issuer_url = template.clone();
            }
        }
    }

    /// Whether the in-cluster Kubernetes API server is a trusted issuer
    ///
    /// Uses the same resolution as token handling, so a meta template that
    /// matches the API server URL counts as well as a fixed entry.
    pub fn uses_kubernetes_api_server(&self) -> bool {
        IssuerRegistry::new(self).resolve_issuer(KUBERNETES_ISSUER_URL).is_some()
    }
}
