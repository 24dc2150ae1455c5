//! ID token verifier handle
//!
//! A verifier is bound to one issuer URL, one expected audience (the issuer's
//! client ID) and the key set discovered for that issuer. Verifiers built by
//! the cache also hold a key source: a token signed with a key the verifier
//! has not seen triggers one JWKS refetch, at most once per refresh interval.

use std::{
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};

use jsonwebtoken::{
    Algorithm, DecodingKey, Header, Validation, decode, decode_header,
    errors::ErrorKind,
    jwk::{AlgorithmParameters, Jwk, JwkSet, PublicKeyUse},
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    discovery::{OidcDiscovery, ProviderMetadata},
    error::VerifyError,
};

/// Default minimum time between two JWKS refetches for one issuer
pub const DEFAULT_KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

struct KeySource {
    discovery: Arc<dyn OidcDiscovery>,
    min_interval: Duration,
}

struct KeyState {
    jwks: Arc<JwkSet>,
    refreshed_at: Option<Instant>,
}

/// Verifies ID tokens from a single issuer
pub struct IdTokenVerifier {
    issuer_url: String,
    client_id: String,
    jwks_uri: String,
    algorithms: Vec<Algorithm>,
    keys: RwLock<KeyState>,
    key_source: Option<KeySource>,
}

impl IdTokenVerifier {
    /// Bind discovered metadata to an issuer URL and client ID
    ///
    /// Only algorithms advertised in the discovery document are accepted;
    /// when none are advertised, RS256 is assumed as OpenID Connect requires.
    /// Unrecognised algorithm names are ignored.
    ///
    /// The key set is fixed until [`Self::with_key_refresh`] attaches a source.
    pub fn new(
        issuer_url: impl Into<String>,
        client_id: impl Into<String>,
        metadata: ProviderMetadata,
    ) -> Self {
        let mut algorithms: Vec<Algorithm> = metadata
            .document
            .id_token_signing_alg_values_supported
            .iter()
            .filter_map(|alg| Algorithm::from_str(alg).ok())
            .collect();
        if algorithms.is_empty() {
            algorithms.push(Algorithm::RS256);
        }

        Self {
            issuer_url: issuer_url.into(),
            client_id: client_id.into(),
            jwks_uri: metadata.document.jwks_uri,
            algorithms,
            keys: RwLock::new(KeyState { jwks: Arc::new(metadata.jwks), refreshed_at: None }),
            key_source: None,
        }
    }

    /// Refetch the JWKS from `discovery` when a token's key is not known
    ///
    /// Refetches are at least `min_interval` apart. The first one after
    /// discovery is never delayed.
    pub fn with_key_refresh(
        mut self,
        discovery: Arc<dyn OidcDiscovery>,
        min_interval: Duration,
    ) -> Self {
        self.key_source = Some(KeySource { discovery, min_interval });
        self
    }

    /// Issuer URL this verifier accepts in `iss`
    pub fn issuer_url(&self) -> &str {
        &self.issuer_url
    }

    /// Audience this verifier requires in `aud`
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// JWKS location advertised by the issuer
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// Signing algorithms this verifier accepts
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Number of keys currently known
    pub async fn key_count(&self) -> usize {
        self.keys.read().await.jwks.keys.len()
    }

    /// Verify a compact JWT and return its claims
    ///
    /// Checks the signature, that `iss` equals the issuer URL, that `aud`
    /// contains the client ID, and the `exp`/`nbf` window. The signing key is
    /// the one named by the header's `kid`; a token without `kid` is tried
    /// against every key that fits its algorithm.
    pub async fn verify(&self, token: &str) -> Result<Value, VerifyError> {
        let header = decode_header(token)?;
        if !self.algorithms.contains(&header.alg) {
            return Err(VerifyError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.issuer_url.as_str()]);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.required_spec_claims.extend(["iss".to_string(), "aud".to_string()]);

        let keys = Arc::clone(&self.keys.read().await.jwks);
        let err = match verify_with_keys(&keys, token, &header, &validation) {
            Ok(claims) => return self.verified(claims, &header),
            Err(err) if is_key_miss(&header, &err) => err,
            Err(err) => return Err(err),
        };

        match self.refresh_keys(&keys).await {
            Some(refreshed) => verify_with_keys(&refreshed, token, &header, &validation)
                .and_then(|claims| self.verified(claims, &header)),
            None => Err(err),
        }
    }

    fn verified(&self, claims: Value, header: &Header) -> Result<Value, VerifyError> {
        tracing::debug!(issuer = %self.issuer_url, kid = ?header.kid, "ID token verified");
        Ok(claims)
    }

    // Returns the key set to retry with, or None when no newer keys are
    // available. `seen` is the set the caller already tried.
    async fn refresh_keys(&self, seen: &Arc<JwkSet>) -> Option<Arc<JwkSet>> {
        let source = self.key_source.as_ref()?;
        let mut state = self.keys.write().await;

        if !Arc::ptr_eq(&state.jwks, seen) {
            return Some(Arc::clone(&state.jwks));
        }
        if state.refreshed_at.is_some_and(|at| at.elapsed() < source.min_interval) {
            tracing::debug!(issuer = %self.issuer_url, "JWKS refresh suppressed");
            return None;
        }
        state.refreshed_at = Some(Instant::now());

        match source.discovery.fetch_jwks(&self.jwks_uri).await {
            Ok(jwks) => {
                tracing::info!(
                    issuer = %self.issuer_url,
                    keys = jwks.keys.len(),
                    "Refreshed issuer signing keys"
                );
                state.jwks = Arc::new(jwks);
                Some(Arc::clone(&state.jwks))
            },
            Err(e) => {
                tracing::warn!(issuer = %self.issuer_url, error = %e, "JWKS refresh failed");
                None
            },
        }
    }
}

impl std::fmt::Debug for IdTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdTokenVerifier")
            .field("issuer_url", &self.issuer_url)
            .field("client_id", &self.client_id)
            .field("jwks_uri", &self.jwks_uri)
            .field("algorithms", &self.algorithms)
            .field("key_refresh", &self.key_source.is_some())
            .finish()
    }
}

fn verify_with_keys(
    jwks: &JwkSet,
    token: &str,
    header: &Header,
    validation: &Validation,
) -> Result<Value, VerifyError> {
    if let Some(kid) = header.kid.as_deref() {
        let jwk = find_key(jwks, kid).ok_or_else(|| VerifyError::UnknownKeyId(kid.to_string()))?;
        let decoding_key = DecodingKey::from_jwk(jwk)?;
        return Ok(decode::<Value>(token, &decoding_key, validation)?.claims);
    }

    let candidates: Vec<&Jwk> = jwks.keys.iter().filter(|jwk| key_fits(jwk, header.alg)).collect();
    if candidates.is_empty() {
        return Err(VerifyError::NoCompatibleKey(format!("{:?}", header.alg)));
    }

    for jwk in candidates {
        let decoding_key = DecodingKey::from_jwk(jwk)?;
        match decode::<Value>(token, &decoding_key, validation) {
            Ok(data) => return Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(VerifyError::InvalidSignature)
}

// A miss means newer keys might verify the token
fn is_key_miss(header: &Header, err: &VerifyError) -> bool {
    match err {
        VerifyError::UnknownKeyId(_) | VerifyError::NoCompatibleKey(_) => true,
        VerifyError::InvalidSignature => header.kid.is_none(),
        _ => false,
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys.iter().find(|key| key.common.key_id.as_deref() == Some(kid))
}

/// Whether `jwk` can check a signature made with `alg`
fn key_fits(jwk: &Jwk, alg: Algorithm) -> bool {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return false;
    }
    if let Some(key_alg) = &jwk.common.key_algorithm {
        return Algorithm::from_str(&format!("{key_alg:?}")).is_ok_and(|a| a == alg);
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => matches!(
            alg,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::EllipticCurve(_) => {
            matches!(alg, Algorithm::ES256 | Algorithm::ES384)
        },
        AlgorithmParameters::OctetKeyPair(_) => alg == Algorithm::EdDSA,
        _ => false,
    }
}
