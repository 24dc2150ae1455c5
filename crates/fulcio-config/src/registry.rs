//! Issuer resolution
//!
//! Maps a token's claimed issuer URL to the configuration that governs it:
//! an exact entry in `OIDCIssuers` wins, otherwise the first meta-issuer
//! template that matches supplies the configuration.

use std::collections::BTreeMap;

use crate::{config::FulcioConfig, issuer::OidcIssuer, meta::MetaIssuerPattern};

/// Read-only lookup structure built once per configuration
#[derive(Debug, Clone)]
pub struct IssuerRegistry {
    exact: BTreeMap<String, OidcIssuer>,
    // In ascending template order
    meta: Vec<(MetaIssuerPattern, OidcIssuer)>,
}

impl IssuerRegistry {
    /// Build the registry, compiling every meta-issuer template
    ///
    /// A template that fails to compile is skipped with a warning and can
    /// never match.
    pub fn new(config: &FulcioConfig) -> Self {
        let meta = config
            .meta_issuers
            .iter()
            .filter_map(|(template, issuer)| match MetaIssuerPattern::compile(template) {
                Ok(pattern) => Some((pattern, issuer.clone())),
                Err(e) => {
                    tracing::warn!(
                        template = %template,
                        error = %e,
                        "Skipping meta issuer with invalid template"
                    );
                    None
                },
            })
            .collect();

        Self { exact: config.oidc_issuers.clone(), meta }
    }

    /// Find the configuration governing `issuer_url`
    ///
    /// Returns `None` if neither an exact entry nor any template matches.
    pub fn resolve_issuer(&self, issuer_url: &str) -> Option<OidcIssuer> {
        if let Some(issuer) = self.exact.get(issuer_url) {
            fulcio_observe::metrics::record_issuer_resolution(true);
            return Some(issuer.clone());
        }

        let matched = self
            .meta
            .iter()
            .find(|(pattern, _)| pattern.is_match(issuer_url))
            .map(|(pattern, template)| {
                tracing::debug!(
                    issuer = %issuer_url,
                    template = %pattern.template(),
                    "Issuer matched meta issuer template"
                );
                template.for_matched_url(issuer_url)
            });

        fulcio_observe::metrics::record_issuer_resolution(matched.is_some());
        matched
    }

    /// Whether `issuer_url` is a fixed (exactly configured) issuer
    pub fn is_fixed(&self, issuer_url: &str) -> bool {
        self.exact.contains_key(issuer_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::issuer::IssuerType;

    const EKS: &str = "https://oidc.eks.*.amazonaws.com/id/*";

    fn test_config() -> FulcioConfig {
        let json = br#"{
            "OIDCIssuers": {
                "https://accounts.google.com": { "ClientID": "sigstore", "Type": "email" },
                "https://oidc.eks.us-west-2.amazonaws.com/id/PINNED": {
                    "ClientID": "pinned",
                    "Type": "email"
                }
            },
            "MetaIssuers": {
                "https://oidc.eks.*.amazonaws.com/id/*": {
                    "ClientID": "sigstore",
                    "Type": "kubernetes"
                },
                "https://example.com/*/auth": {
                    "ClientID": "sigstore",
                    "Type": "uri",
                    "SubjectDomain": "https://example.com"
                }
            }
        }"#;
        FulcioConfig::from_slice(json).unwrap()
    }

    #[test]
    fn test_exact_issuer_resolves() {
        let registry = IssuerRegistry::new(&test_config());
        let issuer = registry.resolve_issuer("https://accounts.google.com").unwrap();
        assert_eq!(issuer.issuer_type, IssuerType::Email);
        assert_eq!(issuer.client_id, "sigstore");
        assert!(registry.is_fixed("https://accounts.google.com"));
    }

    #[test]
    fn test_meta_issuer_resolves_with_actual_url() {
        let registry = IssuerRegistry::new(&test_config());
        let url = "https://oidc.eks.eu-central-1.amazonaws.com/id/ABC123";

        let issuer = registry.resolve_issuer(url).unwrap();
        assert_eq!(issuer.issuer_url, url);
        assert_eq!(issuer.issuer_type, IssuerType::Kubernetes);
        assert_eq!(issuer.client_id, "sigstore");
        assert!(!registry.is_fixed(url));
    }

    #[test]
    fn test_meta_issuer_carries_subject_domain() {
        let registry = IssuerRegistry::new(&test_config());
        let issuer = registry.resolve_issuer("https://example.com/tenant-a/auth").unwrap();
        assert_eq!(issuer.issuer_type, IssuerType::Uri);
        assert_eq!(issuer.subject_domain.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_exact_entry_takes_precedence_over_template() {
        let registry = IssuerRegistry::new(&test_config());
        let issuer =
            registry.resolve_issuer("https://oidc.eks.us-west-2.amazonaws.com/id/PINNED").unwrap();
        assert_eq!(issuer.client_id, "pinned");
        assert_eq!(issuer.issuer_type, IssuerType::Email);
    }

    #[test]
    fn test_unknown_issuer_not_found() {
        let registry = IssuerRegistry::new(&test_config());
        assert!(registry.resolve_issuer("https://attacker.example").is_none());
        assert!(registry.resolve_issuer("").is_none());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let registry = IssuerRegistry::new(&test_config());
        for url in [
            "https://accounts.google.com",
            "https://oidc.eks.us-east-1.amazonaws.com/id/XYZ",
            "https://attacker.example",
        ] {
            assert_eq!(registry.resolve_issuer(url), registry.resolve_issuer(url));
        }
    }

    #[test]
    fn test_templates_tried_in_lexicographic_order() {
        let mut config = FulcioConfig { oidc_issuers: BTreeMap::new(), ..Default::default() };
        for (template, client_id) in
            [("https://z.example.com/*", "second"), ("https://*.example.com/*", "first")]
        {
            config.meta_issuers.insert(
                template.to_string(),
                OidcIssuer::builder()
                    .issuer_url(template)
                    .client_id(client_id)
                    .issuer_type(IssuerType::Email)
                    .build(),
            );
        }

        let registry = IssuerRegistry::new(&config);
        let issuer = registry.resolve_issuer("https://z.example.com/tenant").unwrap();
        assert_eq!(issuer.client_id, "first");
    }

    #[test]
    fn test_template_without_match_is_not_found() {
        let mut config = FulcioConfig::default();
        config.meta_issuers.insert(
            EKS.to_string(),
            OidcIssuer::builder()
                .issuer_url(EKS)
                .client_id("sigstore")
                .issuer_type(IssuerType::Kubernetes)
                .build(),
        );

        let registry = IssuerRegistry::new(&config);
        assert!(registry.resolve_issuer("https://oidc.eks.evil.com/x.amazonaws.com/id/A").is_none());
    }
}
