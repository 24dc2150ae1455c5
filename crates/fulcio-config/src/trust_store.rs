//! Extra TLS roots for discovery requests
//!
//! The store is built per load and handed to the discovery client that load
//! constructs. Nothing here touches process-wide TLS state.

use std::path::Path;

use crate::error::ConfigError;

/// Additional root certificates trusted for OIDC discovery
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    roots: Vec<reqwest::Certificate>,
}

impl TrustStore {
    /// An empty store; only the TLS backend's built-in roots are trusted
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every certificate in a PEM bundle
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TrustStore`] if the bundle cannot be parsed or
    /// contains no certificates.
    pub fn add_pem(&mut self, pem: &[u8]) -> Result<usize, ConfigError> {
        let certs = reqwest::Certificate::from_pem_bundle(pem)
            .map_err(|e| ConfigError::TrustStore(format!("Failed to parse PEM bundle: {}", e)))?;
        if certs.is_empty() {
            return Err(ConfigError::TrustStore("PEM bundle contains no certificates".into()));
        }

        let added = certs.len();
        self.roots.extend(certs);
        Ok(added)
    }

    /// Read a PEM bundle from disk and add it
    pub async fn add_pem_file(&mut self, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
        let path = path.as_ref();
        let pem = tokio::fs::read(path).await.map_err(|e| {
            ConfigError::TrustStore(format!("Failed to read CA bundle {}: {}", path.display(), e))
        })?;

        let added = self.add_pem(&pem)?;
        tracing::info!(
            path = %path.display(),
            certificates = added,
            "Added CA bundle to trust store"
        );
        Ok(added)
    }

    /// Number of extra roots
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether no extra roots were added
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Apply the extra roots to an HTTP client builder
    pub(crate) fn apply(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        self.roots.iter().cloned().fold(builder, |builder, cert| builder.add_root_certificate(cert))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = TrustStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_add_pem_rejects_garbage() {
        let mut store = TrustStore::new();
        let err = store.add_pem(b"not a certificate").unwrap_err();
        assert!(matches!(err, ConfigError::TrustStore(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_pem_file_missing() {
        let mut store = TrustStore::new();
        let err = store.add_pem_file("/nonexistent/fulcio/ca.crt").await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/fulcio/ca.crt"));
    }
}
