//! Test helpers for minting OIDC ID tokens
//!
//! Tokens are signed with Ed25519 (EdDSA), and the matching public key is
//! published as an OKP JWK.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// PKCS#8 v1 prefix for a raw 32-byte Ed25519 private key
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER 0 (version)
    0x30, 0x05, // SEQUENCE, 5 bytes
    0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
    0x04, 0x22, // OCTET STRING, 34 bytes
    0x04, 0x20, // OCTET STRING, 32 bytes
];

/// ID token claims for testing
///
/// # Example
///
/// ```no_run
/// use fulcio_test_fixtures::IdTokenClaims;
///
/// let now = chrono::Utc::now().timestamp();
/// let claims = IdTokenClaims::builder()
///     .iss("https://accounts.example.com")
///     .sub("alice")
///     .aud("sigstore")
///     .exp(now + 300)
///     .iat(now)
///     .build();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, bon::Builder)]
#[builder(on(String, into))]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federated_claims: Option<Value>,
}

impl IdTokenClaims {
    /// Claims valid for five minutes from now
    pub fn valid(issuer: &str, audience: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self::builder()
            .iss(issuer)
            .sub("test-subject")
            .aud(audience)
            .exp(now + 300)
            .iat(now)
            .email("alice@example.com".to_string())
            .build()
    }

    /// Claims that expired an hour ago
    pub fn expired(issuer: &str, audience: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self::builder()
            .iss(issuer)
            .sub("test-subject")
            .aud(audience)
            .exp(now - 3600)
            .iat(now - 7200)
            .build()
    }
}

/// Ed25519 key pair used to sign test ID tokens
#[derive(Clone)]
pub struct TestKeyPair {
    pub kid: String,
    signing_key: SigningKey,
}

impl TestKeyPair {
    /// Generate a fresh key pair
    pub fn generate(kid: impl Into<String>) -> Self {
        Self { kid: kid.into(), signing_key: SigningKey::generate(&mut OsRng) }
    }

    /// Public key as a JWK
    pub fn jwk(&self) -> Value {
        let x = URL_SAFE_NO_PAD.encode(self.signing_key.verifying_key().as_bytes());
        json!({
            "kty": "OKP",
            "use": "sig",
            "kid": self.kid,
            "alg": "EdDSA",
            "crv": "Ed25519",
            "x": x,
        })
    }

    /// JWKS document containing only this key
    pub fn jwks(&self) -> Value {
        json!({ "keys": [self.jwk()] })
    }

    /// Sign `claims` as a compact JWT with this key's `kid`
    pub fn mint(&self, claims: &IdTokenClaims) -> String {
        self.mint_with_kid(claims, Some(&self.kid))
    }

    /// Sign `claims` with an arbitrary (or missing) `kid` header
    pub fn mint_with_kid(&self, claims: &IdTokenClaims, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = kid.map(str::to_string);

        let mut der = ED25519_PKCS8_PREFIX.to_vec();
        der.extend_from_slice(&self.signing_key.to_bytes());

        let encoding_key = EncodingKey::from_ed_der(&der);
        encode(&header, claims, &encoding_key).expect("Failed to encode JWT")
    }
}
