//! Error types for the mtls-echo protocol layer.
//!
//! Each failure class of the service has its own type so callers can tell
//! startup problems, policy rejections and session I/O apart:
//!
//! - [`CredentialLoadError`]: key material could not be loaded at startup.
//! - [`PeerAuthorizationError`]: the peer passed standard certificate
//!   validation but failed the chain-shape or hostname policy.
//! - [`SessionError`]: the echo exchange over an established channel failed.
//!
//! [`ProtoError`] covers credential, certificate parsing and TLS
//! configuration failures for functions that can fail in more than one way.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur within the `mtls-echo-proto` crate.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error(transparent)]
    CredentialLoad(#[from] CredentialLoadError),

    #[error("certificate parse error: {0}")]
    CertificateParse(String),

    #[error("TLS configuration error: {0}")]
    TlsConfiguration(String),
}

/// Result type alias using [`ProtoError`].
pub type Result<T> = std::result::Result<T, ProtoError>;

/// The kind of on-disk artifact a [`CredentialLoadError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Certificate,
    PrivateKey,
    TrustAnchors,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Artifact::Certificate => "certificate",
            Artifact::PrivateKey => "private key",
            Artifact::TrustAnchors => "trust anchors",
        })
    }
}

/// Key material could not be loaded. Always fatal at startup.
#[derive(Debug, Error)]
#[error("failed to load {artifact} from {}: {reason}", path.display())]
pub struct CredentialLoadError {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub reason: String,
}

impl CredentialLoadError {
    pub(crate) fn new(
        artifact: Artifact,
        path: impl Into<PathBuf>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            artifact,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A peer was rejected by the authorization policy.
///
/// The message is the human-readable reason, e.g.
/// `unauthorized peer [example.com], want localhost`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct PeerAuthorizationError {
    reason: String,
}

impl PeerAuthorizationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Failures of the line-echo exchange over an established channel.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer closed the connection mid-session ({buffered} bytes without a newline)")]
    UnexpectedEof { buffered: usize },

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("no data received for {0:?}")]
    IdleTimeout(Duration),
}
