#![allow(dead_code)]

use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use fulcio_config::{
    DiscoveryError, OidcDiscovery, ProviderMetadata, discovery::DiscoveryDocument,
};
use jsonwebtoken::jwk::JwkSet;

/// In-process discovery source that records every call
///
/// Succeeds with an empty key set unless told to fail or stall.
#[derive(Default)]
pub struct RecordingDiscovery {
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
    fail_next: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingDiscovery {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, issuer_url: &str) -> usize {
        self.requested.lock().unwrap().iter().filter(|url| *url == issuer_url).count()
    }

    /// Make the next discovery fail with a 503
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Make every discovery take `delay`
    pub fn stall(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl OidcDiscovery for RecordingDiscovery {
    async fn discover(&self, issuer_url: &str) -> Result<ProviderMetadata, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(issuer_url.to_string());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DiscoveryError::Status {
                url: format!("{}/.well-known/openid-configuration", issuer_url),
                status: 503,
            });
        }

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

pub const META_CONFIG: &[u8] = br#"{
    "OIDCIssuers": {
        "https://accounts.google.com": { "ClientID": "sigstore", "Type": "email" }
    },
    "MetaIssuers": {
        "https://oidc.eks.*.amazonaws.com/id/*": { "ClientID": "sigstore", "Type": "kubernetes" },
        "https://container.googleapis.com/v1/projects/*/locations/*/clusters/*": {
            "ClientID": "gke",
            "Type": "kubernetes"
        }
    }
}"#;
