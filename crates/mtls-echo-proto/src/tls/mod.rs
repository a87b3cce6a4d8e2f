//! TLS plumbing for mutually-authenticated connections.
//!
//! Shared by `mtls-echo-acceptor` and `mtls-echo-initiator`:
//!
//! - Certificate field extraction (DNS SANs, issuer/subject linkage)
//! - Verified-chain construction over the presented certificates
//! - The peer authorization policy and the rustls verifiers that enforce it
//! - TLS config builders (server and client)
//! - Classification of handshake failures

use std::sync::Arc;

use rustls::crypto::CryptoProvider;

pub mod authorizer;
pub mod cert_extract;
pub mod chain;
pub mod config;
pub mod handshake;
pub mod verifier;

/// The crypto provider every config and key load in this crate uses.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}
