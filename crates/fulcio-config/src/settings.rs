//! Service settings
//!
//! Settings are layered with the `config` crate: serde defaults, then an
//! optional settings file, then `FULCIO__*` environment variables
//! (`FULCIO__DISCOVERY_TIMEOUT_SECS=5`).

use std::{path::PathBuf, time::Duration};

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    cache::{CacheOptions, DEFAULT_META_VERIFIER_CAPACITY},
    discovery::DEFAULT_DISCOVERY_TIMEOUT,
    error::ConfigError,
    verifier::DEFAULT_KEY_REFRESH_INTERVAL,
};

/// Settings for loading the issuer trust policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the JSON issuer configuration document
    ///
    /// When the file does not exist the built-in default issuers are used.
    #[serde(default = "default_issuer_config_path")]
    pub issuer_config_path: PathBuf,

    /// CA bundle trusted when `https://kubernetes.default.svc` is configured
    #[serde(default = "default_kubernetes_ca_path")]
    pub kubernetes_ca_path: PathBuf,

    /// Upper bound on a single OIDC discovery
    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,

    /// Capacity of the meta-issuer verifier cache
    #[serde(default = "default_meta_verifier_capacity")]
    pub meta_verifier_capacity: u64,

    /// Minimum seconds between JWKS refetches for one issuer
    #[serde(default = "default_key_refresh_interval_secs")]
    pub key_refresh_interval_secs: u64,

    /// Log level used when `RUST_LOG` is unset
    #[serde(default = "default_logging")]
    pub logging: String,
}

fn default_issuer_config_path() -> PathBuf {
    PathBuf::from("/etc/fulcio-config/config.json")
}

fn default_kubernetes_ca_path() -> PathBuf {
    PathBuf::from("/var/run/fulcio/ca.crt")
}

fn default_discovery_timeout_secs() -> u64 {
    DEFAULT_DISCOVERY_TIMEOUT.as_secs()
}

fn default_meta_verifier_capacity() -> u64 {
    DEFAULT_META_VERIFIER_CAPACITY
}

fn default_key_refresh_interval_secs() -> u64 {
    DEFAULT_KEY_REFRESH_INTERVAL.as_secs()
}

fn default_logging() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            issuer_config_path: default_issuer_config_path(),
            kubernetes_ca_path: default_kubernetes_ca_path(),
            discovery_timeout_secs: default_discovery_timeout_secs(),
            meta_verifier_capacity: default_meta_verifier_capacity(),
            key_refresh_interval_secs: default_key_refresh_interval_secs(),
            logging: default_logging(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file and the environment
    ///
    /// A missing settings file is not an error. Environment variables use the
    /// `FULCIO__` prefix and take precedence over the file.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let builder = builder
            .add_source(Environment::with_prefix("FULCIO").separator("__").try_parsing(true));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would disable discovery or caching
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery_timeout_secs == 0 {
            return Err(ConfigError::Settings(config::ConfigError::Message(
                "discovery_timeout_secs must be greater than 0".to_string(),
            )));
        }

        if self.meta_verifier_capacity == 0 {
            return Err(ConfigError::Settings(config::ConfigError::Message(
                "meta_verifier_capacity must be greater than 0".to_string(),
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.to_lowercase().as_str()) {
            return Err(ConfigError::Settings(config::ConfigError::Message(format!(
                "Invalid logging level: '{}'. Must be one of: {}",
                self.logging,
                valid_levels.join(", ")
            ))));
        }

        Ok(())
    }

    /// Discovery timeout as a [`Duration`]
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    /// Verifier cache tuning derived from these settings
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::builder()
            .discovery_timeout(self.discovery_timeout())
            .meta_capacity(self.meta_verifier_capacity)
            .key_refresh_interval(Duration::from_secs(self.key_refresh_interval_secs))
            .build()
    }
}
