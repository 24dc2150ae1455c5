//! # Fulcio Observe - Observability Layer
//!
//! Centralized tracing and metrics setup for the issuer trust core.

#![deny(unsafe_code)]

use std::sync::OnceLock;

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Global Prometheus handle for rendering metrics
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub mod metrics;

/// Configuration for log output
#[derive(Debug, Clone, bon::Builder)]
#[builder(on(String, into))]
pub struct TracingConfig {
    /// Service name reported in the startup log line
    #[builder(default = "fulcio".to_string())]
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset
    #[builder(default = "info,fulcio=debug".to_string())]
    pub default_filter: String,
    /// Emit the event target (module path) with each line
    #[builder(default = false)]
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Initialize tracing with the given configuration
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing_with_config(config: TracingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(config.with_target));

    // Try to init, but don't fail if already initialized
    if subscriber.try_init().is_err() {
        tracing::debug!("Tracing already initialized, skipping");
        return Ok(());
    }

    tracing::info!(service = config.service_name, "Tracing initialized");

    Ok(())
}

/// Initialize tracing with default configuration
pub fn init_tracing() -> Result<()> {
    init_tracing_with_config(TracingConfig::default())
}

/// Initialize Prometheus metrics exporter and store the handle for rendering
pub fn init_metrics() -> Result<()> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    let _ = PROMETHEUS_HANDLE.set(handle);

    metrics::init_metrics_descriptions();

    tracing::info!("Metrics exporter initialized");

    Ok(())
}

/// Render current metrics in Prometheus text format
///
/// Returns None if metrics haven't been initialized yet
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// Initialize full observability stack
pub fn init() -> Result<()> {
    init_tracing()?;
    init_metrics()?;

    Ok(())
}
