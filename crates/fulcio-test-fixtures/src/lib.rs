//! Test fixtures for Fulcio integration tests
//!
//! A mock OIDC provider serving discovery and JWKS, and helpers for minting
//! ID tokens it will vouch for.

#![deny(unsafe_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod id_token;
pub mod mock_oidc;

pub use id_token::{IdTokenClaims, TestKeyPair};
pub use mock_oidc::{
    MOCK_KID, MockOidcOptions, MockOidcServer, start_mock_oidc_server, start_mock_oidc_server_with,
};
