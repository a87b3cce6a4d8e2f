//! Peer authorization policy.
//!
//! Runs after standard certificate validation has accepted the peer and
//! before the handshake completes. The same policy applies to both roles:
//!
//! 1. the peer presented exactly one certificate;
//! 2. exactly one verified chain leads from it to a trust anchor;
//! 3. that chain is exactly leaf + issuer;
//! 4. the leaf lists `localhost` among its DNS subject alternative names.
//!
//! Everything here is pure: no I/O, no shared state, no retries.

use std::iter;

use rustls_pki_types::CertificateDer;

use crate::credentials::TrustAnchorSet;
use crate::error::PeerAuthorizationError;
use crate::tls::cert_extract::dns_names;
use crate::tls::chain::{build_verified_chains, VerifiedChain};

/// DNS name every authorized peer's leaf certificate must carry.
pub const AUTHORIZED_PEER_NAME: &str = "localhost";

/// Required length of the single verified chain (leaf + issuer).
pub const REQUIRED_CHAIN_LEN: usize = 2;

/// Outcome of authorizing one handshake's peer.
pub type AuthorizationDecision = Result<(), PeerAuthorizationError>;

/// Apply the policy to the certificates the peer presented (`raw_certs`,
/// leaf first) and the chains path validation produced.
pub fn authorize_peer(
    raw_certs: &[CertificateDer<'_>],
    verified_chains: &[VerifiedChain],
) -> AuthorizationDecision {
    if raw_certs.len() != 1 {
        return Err(PeerAuthorizationError::new(format!(
            "expected a single certificate, got {}",
            raw_certs.len()
        )));
    }

    let [chain] = verified_chains else {
        return Err(PeerAuthorizationError::new(format!(
            "expected a single verified chain, got {}",
            verified_chains.len()
        )));
    };

    if chain.len() != REQUIRED_CHAIN_LEN {
        return Err(PeerAuthorizationError::new(format!(
            "expected a verified chain of two certificates, got {}",
            chain.len()
        )));
    }

    let names = dns_names(&chain[0])
        .map_err(|e| PeerAuthorizationError::new(format!("unreadable peer certificate: {e}")))?;

    if !names.iter().any(|name| name == AUTHORIZED_PEER_NAME) {
        return Err(PeerAuthorizationError::new(format!(
            "unauthorized peer [{}], want {AUTHORIZED_PEER_NAME}",
            names.join(" ")
        )));
    }

    Ok(())
}

/// Build the verified chains for a presented certificate list and authorize
/// the result. This is what the rustls verifiers call.
pub fn authorize_presented(
    end_entity: &CertificateDer<'_>,
    intermediates: &[CertificateDer<'_>],
    anchors: &TrustAnchorSet,
) -> AuthorizationDecision {
    let raw_certs: Vec<CertificateDer<'_>> = iter::once(end_entity.clone())
        .chain(intermediates.iter().cloned())
        .collect();
    let chains = build_verified_chains(end_entity, intermediates, anchors);
    authorize_peer(&raw_certs, &chains)
}
