//! # Fulcio Trust CLI
//!
//! Loads the issuer trust policy the same way the certificate authority does,
//! so operators can check a configuration before rolling it out.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fulcio_config::{FulcioConfig, IssuerRegistry, Settings, loader};
use fulcio_observe::TracingConfig;

#[derive(Parser, Debug)]
#[command(name = "fulcio-trust")]
#[command(about = "Check and query the Fulcio issuer trust policy", long_about = None)]
struct Args {
    /// Path to the settings file
    #[arg(short, long, env = "FULCIO_SETTINGS")]
    settings: Option<PathBuf>,

    /// Issuer configuration document (overrides settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, validate and pre-warm the policy; exit non-zero on any failure
    Check,

    /// Print the configuration that governs an issuer URL
    Resolve {
        /// Issuer URL as it would appear in a token's `iss` claim
        issuer_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.settings.as_deref())?;
    if let Some(path) = args.config {
        settings.issuer_config_path = path;
    }

    fulcio_observe::init_tracing_with_config(
        TracingConfig::builder()
            .service_name("fulcio-trust")
            .default_filter(settings.logging.clone())
            .build(),
    )?;
    fulcio_observe::init_metrics()?;

    match args.command {
        Command::Check => check(&settings).await,
        Command::Resolve { issuer_url } => resolve(&settings, &issuer_url).await,
    }
}

async fn check(settings: &Settings) -> Result<()> {
    let trust = loader::load(settings).await.with_context(|| {
        format!("issuer configuration {} is not usable", settings.issuer_config_path.display())
    })?;

    let config = trust.config();
    println!(
        "OK: {} fixed issuers, {} meta issuers",
        config.oidc_issuers.len(),
        config.meta_issuers.len()
    );

    Ok(())
}

// Resolution needs no discovery, so this only parses and validates
async fn resolve(settings: &Settings, issuer_url: &str) -> Result<()> {
    let config = match loader::read_config_bytes(&settings.issuer_config_path).await? {
        Some(bytes) => FulcioConfig::from_slice(&bytes)?,
        None => {
            tracing::info!("Issuer config not found, resolving against default issuers");
            FulcioConfig::default()
        },
    };

    match IssuerRegistry::new(&config).resolve_issuer(issuer_url) {
        Some(issuer) => {
            println!("{}", serde_json::to_string_pretty(&issuer)?);
            Ok(())
        },
        None => {
            anyhow::bail!("no issuer configuration matches {}", issuer_url)
        },
    }
}
