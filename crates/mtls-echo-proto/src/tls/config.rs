//! TLS configuration builders for the acceptor and initiator roles.
//!
//! Both builders enforce:
//! - the ring crypto provider, safe default protocol versions
//! - mutual authentication: each side presents its identity
//! - peer validation against the shared [`TrustAnchorSet`] followed by the
//!   peer authorization policy

use std::sync::Arc;

use rustls::client::danger::ServerCertVerifier;
use rustls::server::danger::ClientCertVerifier;

use crate::credentials::{IdentityCredential, TrustAnchorSet};
use crate::error::{ProtoError, Result};
use crate::tls::crypto_provider;
use crate::tls::verifier::{AuthorizingClientVerifier, AuthorizingServerVerifier};

/// Build a `rustls::ServerConfig` for the acceptor.
///
/// Client certificates are required and verified against `anchors`.
pub fn build_acceptor_tls_config(
    identity: &IdentityCredential,
    anchors: Arc<TrustAnchorSet>,
) -> Result<rustls::ServerConfig> {
    let verifier: Arc<dyn ClientCertVerifier> = Arc::new(AuthorizingClientVerifier::new(anchors)?);

    rustls::ServerConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| ProtoError::TlsConfiguration(format!("TLS version config: {e}")))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(identity.cert_chain().to_vec(), identity.private_key())
        .map_err(|e| ProtoError::TlsConfiguration(format!("acceptor cert config: {e}")))
}

/// Build a `rustls::ClientConfig` for the initiator.
///
/// The config presents the initiator identity and verifies the acceptor
/// against `anchors`.
pub fn build_initiator_tls_config(
    identity: &IdentityCredential,
    anchors: Arc<TrustAnchorSet>,
) -> Result<rustls::ClientConfig> {
    let verifier: Arc<dyn ServerCertVerifier> = Arc::new(AuthorizingServerVerifier::new(anchors)?);

    rustls::ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| ProtoError::TlsConfiguration(format!("TLS version config: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_client_auth_cert(identity.cert_chain().to_vec(), identity.private_key())
        .map_err(|e| ProtoError::TlsConfiguration(format!("initiator cert config: {e}")))
}
