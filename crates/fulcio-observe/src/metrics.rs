//! Metrics for issuer resolution, verifier caching and OIDC discovery
//!
//! Recording functions are safe to call before [`crate::init_metrics`]; the
//! `metrics` facade drops samples when no recorder is installed.

use ::metrics::{counter, describe_counter, describe_gauge, gauge};

/// Initialize metric descriptions
pub fn init_metrics_descriptions() {
    describe_counter!(
        "fulcio_oidc_discovery_total",
        "Total number of OIDC discovery attempts with result status"
    );

    describe_counter!(
        "fulcio_verifier_cache_lookups_total",
        "Verifier cache lookups by tier (fixed, meta) and result (hit, miss)"
    );

    describe_counter!(
        "fulcio_issuer_resolutions_total",
        "Issuer resolutions with result status (found, not_found)"
    );

    describe_counter!(
        "fulcio_config_loads_total",
        "Issuer configuration loads with result status"
    );

    describe_gauge!(
        "fulcio_configured_issuers",
        "Number of configured issuers per kind (fixed, meta)"
    );
}

/// Record an OIDC discovery attempt
pub fn record_oidc_discovery(issuer: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(
        "fulcio_oidc_discovery_total",
        "issuer" => issuer.to_string(),
        "result" => result
    )
    .increment(1);
}

/// Record a verifier cache lookup
///
/// `tier` is `"fixed"` for pre-warmed issuers and `"meta"` for the bounded cache.
pub fn record_verifier_cache_lookup(tier: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("fulcio_verifier_cache_lookups_total", "tier" => tier, "result" => result)
        .increment(1);
}

/// Record an issuer resolution
pub fn record_issuer_resolution(found: bool) {
    let result = if found { "found" } else { "not_found" };
    counter!("fulcio_issuer_resolutions_total", "result" => result).increment(1);
}

/// Record a configuration load attempt
pub fn record_config_load(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("fulcio_config_loads_total", "result" => result).increment(1);
}

/// Update the configured issuer counts after a successful load
pub fn set_configured_issuers(fixed: usize, meta: usize) {
    gauge!("fulcio_configured_issuers", "kind" => "fixed").set(fixed as f64);
    gauge!("fulcio_configured_issuers", "kind" => "meta").set(meta as f64);
}
