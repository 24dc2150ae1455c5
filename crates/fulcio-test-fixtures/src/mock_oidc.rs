//! Mock OIDC provider for integration testing
//!
//! Serves:
//! - OIDC discovery at `/.well-known/openid-configuration`
//! - per-tenant discovery at `/tenants/{tenant}/.well-known/openid-configuration`,
//!   so one server can stand in for many issuers matched by a meta-issuer
//!   template such as `http://127.0.0.1:*/tenants/*`
//! - the JWKS at `/jwks.json`, which [`MockOidcServer::rotate_key`] replaces

use std::{
    net::SocketAddr,
    sync::{
        Arc, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::id_token::TestKeyPair;

/// Key id published by the mock provider
pub const MOCK_KID: &str = "mock-oidc-key-001";

/// Behaviour switches for the mock provider
#[derive(Debug, Clone, Default, bon::Builder)]
#[builder(on(String, into))]
pub struct MockOidcOptions {
    /// Advertise this issuer instead of the requested one
    pub issuer_override: Option<String>,
    /// Delay every discovery response
    pub discovery_delay: Option<Duration>,
    /// Answer discovery with 500
    #[builder(default)]
    pub fail_discovery: bool,
}

#[derive(Clone)]
struct MockState {
    base_url: String,
    options: MockOidcOptions,
    published: Arc<RwLock<TestKeyPair>>,
    discovery_hits: Arc<AtomicUsize>,
    jwks_hits: Arc<AtomicUsize>,
}

/// A running mock provider
pub struct MockOidcServer {
    /// `http://127.0.0.1:{port}`
    pub base_url: String,
    /// Key the provider started with
    pub keypair: TestKeyPair,
    handle: JoinHandle<()>,
    published: Arc<RwLock<TestKeyPair>>,
    discovery_hits: Arc<AtomicUsize>,
    jwks_hits: Arc<AtomicUsize>,
}

impl MockOidcServer {
    /// Issuer URL of the root provider
    pub fn issuer(&self) -> &str {
        &self.base_url
    }

    /// Issuer URL of a tenant provider
    pub fn tenant_issuer(&self, tenant: &str) -> String {
        format!("{}/tenants/{}", self.base_url, tenant)
    }

    /// Number of discovery documents served so far
    pub fn discovery_hits(&self) -> usize {
        self.discovery_hits.load(Ordering::SeqCst)
    }

    /// Number of JWKS documents served so far
    pub fn jwks_hits(&self) -> usize {
        self.jwks_hits.load(Ordering::SeqCst)
    }

    /// Publish a fresh key under `kid` in place of the current one
    pub fn rotate_key(&self, kid: &str) -> TestKeyPair {
        let keypair = TestKeyPair::generate(kid);
        *self.published.write().unwrap() = keypair.clone();
        keypair
    }
}

impl Drop for MockOidcServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn discovery_document(state: &MockState, issuer: String) -> Response {
    state.discovery_hits.fetch_add(1, Ordering::SeqCst);

    if let Some(delay) = state.options.discovery_delay {
        tokio::time::sleep(delay).await;
    }
    if state.options.fail_discovery {
        return (StatusCode::INTERNAL_SERVER_ERROR, "discovery unavailable").into_response();
    }

    let issuer = state.options.issuer_override.clone().unwrap_or(issuer);
    Json(json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{}/authorize", state.base_url),
        "token_endpoint": format!("{}/token", state.base_url),
        "jwks_uri": format!("{}/jwks.json", state.base_url),
        "response_types_supported": ["id_token"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": ["EdDSA"],
    }))
    .into_response()
}

async fn root_discovery_handler(State(state): State<MockState>) -> Response {
    let issuer = state.base_url.clone();
    discovery_document(&state, issuer).await
}

async fn tenant_discovery_handler(
    State(state): State<MockState>,
    Path(tenant): Path<String>,
) -> Response {
    let issuer = format!("{}/tenants/{}", state.base_url, tenant);
    discovery_document(&state, issuer).await
}

async fn jwks_handler(State(state): State<MockState>) -> Json<Value> {
    state.jwks_hits.fetch_add(1, Ordering::SeqCst);
    let jwks = state.published.read().unwrap().jwks();
    Json(jwks)
}

/// Start a mock provider with default behaviour on a random port
pub async fn start_mock_oidc_server() -> MockOidcServer {
    start_mock_oidc_server_with(MockOidcOptions::default()).await
}

/// Start a mock provider on a random port
pub async fn start_mock_oidc_server_with(options: MockOidcOptions) -> MockOidcServer {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let keypair = TestKeyPair::generate(MOCK_KID);
    let published = Arc::new(RwLock::new(keypair.clone()));
    let discovery_hits = Arc::new(AtomicUsize::new(0));
    let jwks_hits = Arc::new(AtomicUsize::new(0));
    let state = MockState {
        base_url: base_url.clone(),
        options,
        published: Arc::clone(&published),
        discovery_hits: Arc::clone(&discovery_hits),
        jwks_hits: Arc::clone(&jwks_hits),
    };

    let app = Router::new()
        .route("/.well-known/openid-configuration", get(root_discovery_handler))
        .route("/tenants/{tenant}/.well-known/openid-configuration", get(tenant_discovery_handler))
        .route("/jwks.json", get(jwks_handler))
        .with_state(state);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockOidcServer { base_url, keypair, handle, published, discovery_hits, jwks_hits }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_oidc_server_discovery() {
        let server = start_mock_oidc_server().await;

        let response = reqwest::get(format!("{}/.well-known/openid-configuration", server.base_url))
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        let discovery: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(discovery["issuer"], server.base_url);
        assert!(discovery["jwks_uri"].as_str().unwrap().ends_with("/jwks.json"));
        assert_eq!(server.discovery_hits(), 1);
    }

    #[tokio::test]
    async fn test_mock_oidc_server_tenant_discovery() {
        let server = start_mock_oidc_server().await;
        let issuer = server.tenant_issuer("acme");

        let discovery: Value = reqwest::get(format!("{}/.well-known/openid-configuration", issuer))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(discovery["issuer"], issuer);
    }

    #[tokio::test]
    async fn test_mock_oidc_server_jwks() {
        let server = start_mock_oidc_server().await;

        let jwks: Value =
            reqwest::get(format!("{}/jwks.json", server.base_url)).await.unwrap().json().await.unwrap();
        assert_eq!(jwks["keys"].as_array().unwrap().len(), 1);
        assert_eq!(jwks["keys"][0]["kid"], MOCK_KID);
        assert_eq!(server.jwks_hits(), 1);
    }

    #[tokio::test]
    async fn test_mock_oidc_server_key_rotation() {
        let server = start_mock_oidc_server().await;
        let rotated = server.rotate_key("mock-oidc-key-002");

        let jwks: Value = reqwest::get(format!("{}/jwks.json", server.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(jwks["keys"].as_array().unwrap().len(), 1);
        assert_eq!(jwks["keys"][0]["kid"], rotated.kid);
    }

    #[tokio::test]
    async fn test_mock_oidc_server_failing_discovery() {
        let server =
            start_mock_oidc_server_with(MockOidcOptions::builder().fail_discovery(true).build())
                .await;

        let response = reqwest::get(format!("{}/.well-known/openid-configuration", server.base_url))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
