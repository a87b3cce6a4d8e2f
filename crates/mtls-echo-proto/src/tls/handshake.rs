//! Classification of failed TLS handshakes.
//!
//! tokio-rustls reports every handshake failure as an `io::Error`. When the
//! local verifier rejected the peer by policy, the `rustls::Error` inside it
//! carries a [`PeerAuthorizationError`]; everything else (untrusted root,
//! expiry, alerts from the peer, transport errors) is an ordinary handshake
//! failure.

use std::io;

use crate::error::PeerAuthorizationError;

/// Why a handshake did not reach the established state.
#[derive(Debug)]
pub enum HandshakeFailure {
    /// The peer passed standard validation but failed the local policy.
    Rejected(PeerAuthorizationError),
    /// Standard TLS validation or transport failure.
    Failed(io::Error),
}

/// Sort a handshake `io::Error` into policy rejection or plain failure.
pub fn classify_handshake_error(err: io::Error) -> HandshakeFailure {
    match policy_rejection(&err) {
        Some(rejected) => HandshakeFailure::Rejected(rejected),
        None => HandshakeFailure::Failed(err),
    }
}

fn policy_rejection(err: &io::Error) -> Option<PeerAuthorizationError> {
    let tls = err.get_ref()?.downcast_ref::<rustls::Error>()?;
    match tls {
        rustls::Error::Other(other) => other.0.downcast_ref::<PeerAuthorizationError>().cloned(),
        _ => None,
    }
}
