//! Axum extractor for the active issuer trust policy
//!
//! The server installs the current `Arc<IssuerTrust>` into each request's
//! extensions (for example with `axum::Extension`). Handlers then take
//! [`ActiveConfig`] instead of reaching for a global.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::trust::IssuerTrust;

/// Extractor for the issuer trust policy in effect for this request
///
/// Returns 500 Internal Server Error if no policy was installed, since that
/// is a server wiring fault rather than a client error.
///
/// # Example
///
/// ```rust,no_run
/// use fulcio_config::extractor::ActiveConfig;
///
/// async fn issuer_known(ActiveConfig(trust): ActiveConfig) -> &'static str {
///     match trust.resolve_issuer("https://accounts.google.com") {
///         Some(_) => "known",
///         None => "unknown",
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ActiveConfig(pub Arc<IssuerTrust>);

impl<S> FromRequestParts<S> for ActiveConfig
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Arc<IssuerTrust>>().cloned().map(ActiveConfig).ok_or_else(|| {
            tracing::error!("No issuer trust policy installed on request");
            (StatusCode::INTERNAL_SERVER_ERROR, "Issuer configuration not available").into_response()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use axum::http::Request;
    use jsonwebtoken::jwk::JwkSet;

    use super::*;
    use crate::{
        cache::CacheOptions,
        config::FulcioConfig,
        discovery::{DiscoveryDocument, OidcDiscovery, ProviderMetadata},
        error::DiscoveryError,
    };

    struct StaticDiscovery;

    #[async_trait]
    impl OidcDiscovery for StaticDiscovery {
        async fn discover(&self, issuer_url: &str) -> Result<ProviderMetadata, DiscoveryError> {
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

    async fn test_trust() -> Arc<IssuerTrust> {
        let trust = IssuerTrust::prepare(
            FulcioConfig::default(),
            Arc::new(StaticDiscovery),
            CacheOptions::default(),
        )
        .await
        .unwrap();
        Arc::new(trust)
    }

    #[tokio::test]
    async fn test_active_config_with_policy() {
        let trust = test_trust().await;
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut().insert(Arc::clone(&trust));

        let (mut parts, _) = req.into_parts();
        let ActiveConfig(extracted) =
            ActiveConfig::from_request_parts(&mut parts, &()).await.unwrap();

        assert!(Arc::ptr_eq(&extracted, &trust));
        assert!(extracted.resolve_issuer("https://accounts.google.com").is_some());
    }

    #[tokio::test]
    async fn test_active_config_without_policy() {
        let req = Request::builder().body(()).unwrap();
        let (mut parts, _) = req.into_parts();

        let response = ActiveConfig::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
