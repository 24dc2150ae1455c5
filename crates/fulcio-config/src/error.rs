//! Error types
//!
//! Load failures ([`ConfigError`]) are fatal to the load that produced them.
//! Discovery and token failures are reported per issuer and per token.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that abort loading an issuer configuration
///
/// Every variant is fatal to the load or reload that produced it; no partial
/// configuration is made active.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration bytes are not a valid configuration document
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A structural or domain-binding rule was violated
    #[error("Invalid config: {0}")]
    Validation(#[from] ValidationError),

    /// Discovery failed for a statically configured issuer
    #[error("OIDC discovery failed for issuer {issuer}: {source}")]
    Discovery {
        /// Issuer URL whose verifier could not be created
        issuer: String,
        /// Underlying discovery failure
        #[source]
        source: DiscoveryError,
    },

    /// The TLS trust store for discovery could not be built
    #[error("Trust store error: {0}")]
    TrustStore(String),

    /// Service settings could not be loaded
    #[error("Failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),
}

/// Errors from fetching OIDC discovery metadata
///
/// These never reach token presenters. For meta issuers they are logged and
/// turned into a resolution miss.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The HTTP client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// Network request failed
    #[error("Request to {url} failed: {message}")]
    Http {
        /// URL that was requested
        url: String,
        /// Transport error description
        message: String,
    },

    /// The provider answered with a non-success status
    #[error("{url} returned status {status}")]
    Status {
        /// URL that was requested
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The discovery document is malformed or missing required fields
    #[error("Invalid discovery document: {0}")]
    InvalidDocument(String),

    /// The discovery document names a different issuer than requested
    #[error("Issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch {
        /// Issuer URL that was requested
        expected: String,
        /// Issuer advertised by the document
        actual: String,
    },

    /// The JWKS could not be fetched or parsed
    #[error("Invalid JWKS: {0}")]
    Jwks(String),

    /// Discovery did not complete within the allotted time
    #[error("Discovery timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from verifying an ID token against a verifier handle
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Malformed JWT - cannot be decoded
    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// Token header has no `kid` and no key fits its algorithm
    #[error("No signing key fits algorithm {0}")]
    NoCompatibleKey(String),

    /// No key in the issuer's JWKS matches the token's `kid`
    #[error("No signing key found for kid: {0}")]
    UnknownKeyId(String),

    /// Algorithm not advertised by the issuer
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature verification failed
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token has expired
    #[error("Token expired")]
    TokenExpired,

    /// Token not yet valid (nbf claim in future)
    #[error("Token not yet valid")]
    TokenNotYetValid,

    /// `iss` does not match the verifier's issuer
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// `aud` does not contain the configured client ID
    #[error("Invalid audience")]
    InvalidAudience,
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
            ErrorKind::ExpiredSignature => VerifyError::TokenExpired,
            ErrorKind::ImmatureSignature => VerifyError::TokenNotYetValid,
            ErrorKind::InvalidAudience => VerifyError::InvalidAudience,
            ErrorKind::InvalidIssuer => VerifyError::InvalidIssuer,
            ErrorKind::InvalidAlgorithm => {
                VerifyError::UnsupportedAlgorithm("Algorithm not supported".into())
            },
            _ => VerifyError::InvalidTokenFormat(format!("JWT error: {}", err)),
        }
    }
}
