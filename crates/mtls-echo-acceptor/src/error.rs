//! Error types for the acceptor transport layer.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use mtls_echo_proto::error::{PeerAuthorizationError, ProtoError, SessionError};
use mtls_echo_proto::HandshakeFailure;
use thiserror::Error;

/// Errors that can occur in the acceptor transport.
#[derive(Debug, Error)]
pub enum AcceptorError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("connection accept failed: {0}")]
    Accept(#[source] io::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("TLS handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("peer rejected: {0}")]
    PeerRejected(#[from] PeerAuthorizationError),

    #[error("session failed: {0}")]
    Session(#[from] SessionError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtoError),
}

impl From<HandshakeFailure> for AcceptorError {
    fn from(failure: HandshakeFailure) -> Self {
        match failure {
            HandshakeFailure::Rejected(e) => AcceptorError::PeerRejected(e),
            HandshakeFailure::Failed(e) => AcceptorError::Handshake(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AcceptorError>;
