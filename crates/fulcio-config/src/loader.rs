//! Loading the issuer trust policy
//!
//! A load reads the configuration document (falling back to the built-in
//! issuers when the file does not exist), parses and validates it, builds a
//! trust store for this load, and pre-warms verifiers for every fixed issuer.
//! Any failure aborts the load; nothing partial is returned.

use std::{io::ErrorKind, path::Path, sync::Arc};

use crate::{
    cache::CacheOptions,
    config::FulcioConfig,
    discovery::{HttpDiscoveryClient, OidcDiscovery},
    error::ConfigError,
    settings::Settings,
    trust::IssuerTrust,
    trust_store::TrustStore,
};

/// Read the configuration document
///
/// Returns `Ok(None)` if the file does not exist.
pub async fn read_config_bytes(path: &Path) -> Result<Option<Vec<u8>>, ConfigError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
    }
}

/// Load the policy named by `settings.issuer_config_path`
pub async fn load(settings: &Settings) -> Result<IssuerTrust, ConfigError> {
    let result = async {
        let config = match read_config_bytes(&settings.issuer_config_path).await? {
            Some(bytes) => FulcioConfig::from_slice(&bytes)?,
            None => {
                tracing::info!(
                    path = %settings.issuer_config_path.display(),
                    "Issuer config not found, using default issuers"
                );
                FulcioConfig::default()
            },
        };
        prepare_with_http(config, settings).await
    }
    .await;

    finish(result)
}

/// Load a policy from an in-memory document
pub async fn read(bytes: &[u8], settings: &Settings) -> Result<IssuerTrust, ConfigError> {
    let result = async {
        let config = FulcioConfig::from_slice(bytes)?;
        prepare_with_http(config, settings).await
    }
    .await;

    finish(result)
}

/// Load a policy from an in-memory document using a caller-supplied
/// discovery source
pub async fn read_with_discovery(
    bytes: &[u8],
    discovery: Arc<dyn OidcDiscovery>,
    options: CacheOptions,
) -> Result<IssuerTrust, ConfigError> {
    let result = async {
        let config = FulcioConfig::from_slice(bytes)?;
        IssuerTrust::prepare(config, discovery, options).await
    }
    .await;

    finish(result)
}

/// Build the trust store this load's discovery client uses
///
/// The cluster CA bundle is only read when the in-cluster API server is a
/// configured issuer; it must then exist and parse.
pub async fn trust_store_for(
    config: &FulcioConfig,
    settings: &Settings,
) -> Result<TrustStore, ConfigError> {
    let mut trust_store = TrustStore::new();
    if config.uses_kubernetes_api_server() {
        trust_store.add_pem_file(&settings.kubernetes_ca_path).await?;
    }
    Ok(trust_store)
}

async fn prepare_with_http(
    config: FulcioConfig,
    settings: &Settings,
) -> Result<IssuerTrust, ConfigError> {
    let trust_store = trust_store_for(&config, settings).await?;
    let discovery = HttpDiscoveryClient::new(&trust_store, settings.discovery_timeout())
        .map_err(|e| ConfigError::TrustStore(e.to_string()))?;

    IssuerTrust::prepare(config, Arc::new(discovery), settings.cache_options()).await
}

fn finish(result: Result<IssuerTrust, ConfigError>) -> Result<IssuerTrust, ConfigError> {
    fulcio_observe::metrics::record_config_load(result.is_ok());

    match &result {
        Ok(trust) => {
            let config = trust.config();
            fulcio_observe::metrics::set_configured_issuers(
                config.oidc_issuers.len(),
                config.meta_issuers.len(),
            );
            tracing::info!(
                fixed_issuers = config.oidc_issuers.len(),
                meta_issuers = config.meta_issuers.len(),
                "Issuer configuration loaded"
            );
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to load issuer configuration");
        },
    }

    result
}
