//! Error types for the initiator transport layer.

use std::io;
use std::time::Duration;

use mtls_echo_proto::error::{PeerAuthorizationError, ProtoError, SessionError};
use mtls_echo_proto::HandshakeFailure;
use thiserror::Error;

/// Errors that can occur in the initiator transport. All of them are
/// terminal: nothing is retried.
#[derive(Debug, Error)]
pub enum InitiatorError {
    #[error("failed to connect to {remote}: {source}")]
    Connect {
        remote: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid server name {0:?}")]
    InvalidServerName(String),

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

impl From<HandshakeFailure> for InitiatorError {
    fn from(failure: HandshakeFailure) -> Self {
        match failure {
            HandshakeFailure::Rejected(e) => InitiatorError::PeerRejected(e),
            HandshakeFailure::Failed(e) => InitiatorError::Handshake(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, InitiatorError>;
