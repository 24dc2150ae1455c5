//! # Fulcio Issuer Trust
//!
//! Decides which OIDC issuers the certificate authority trusts, and for what.
//!
//! ## Features
//!
//! - **Issuer resolution**: exact issuer URLs plus meta-issuer templates such
//!   as `https://oidc.eks.*.amazonaws.com/id/*`
//! - **Verifier caching**: fixed issuers are discovered at load time, meta
//!   issuers lazily into a bounded cache
//! - **Domain binding**: `uri` and `username` issuers may only vouch for
//!   subjects in their own domain
//!
//! ## Example
//!
//! ```no_run
//! use fulcio_config::{Settings, loader};
//!
//! # async fn example() -> Result<(), fulcio_config::ConfigError> {
//! let trust = loader::load(&Settings::default()).await?;
//!
//! if let Some(verifier) = trust.get_verifier("https://accounts.google.com").await {
//!     let _claims = verifier.verify("eyJ...").await;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Verifier cache for fixed and meta issuers
pub mod cache;
/// Federated issuer claim lookup
pub mod claims;
/// Issuer configuration document and defaults
pub mod config;
/// OIDC discovery client
pub mod discovery;
/// Error types
pub mod error;
/// Axum extractor for the active policy
pub mod extractor;
/// Issuer configuration model
pub mod issuer;
/// Configuration loading
pub mod loader;
/// Meta-issuer template matching
pub mod meta;
/// Issuer resolution
pub mod registry;
/// Service settings
pub mod settings;
/// Active issuer trust policy
pub mod trust;
/// Extra TLS roots for discovery
pub mod trust_store;
/// Issuer configuration validation
pub mod validation;
/// ID token verifier handle
pub mod verifier;

pub use cache::{CacheOptions, DEFAULT_META_VERIFIER_CAPACITY, VerifierCache};
pub use config::FulcioConfig;
pub use discovery::{HttpDiscoveryClient, OidcDiscovery, ProviderMetadata};
pub use error::{ConfigError, DiscoveryError, VerifyError};
pub use extractor::ActiveConfig;
pub use issuer::{IssuerType, OidcIssuer};
pub use registry::IssuerRegistry;
pub use settings::Settings;
pub use trust::IssuerTrust;
pub use trust_store::TrustStore;
pub use validation::{DomainError, ValidationError};
pub use verifier::IdTokenVerifier;
