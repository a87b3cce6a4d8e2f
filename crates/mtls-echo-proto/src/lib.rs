//! mtls-echo protocol layer.
//!
//! Shared by `mtls-echo-acceptor` and `mtls-echo-initiator`:
//!
//! - Credential loading (identities and trust anchors from a keys directory)
//! - The peer authorization policy and the rustls verifiers enforcing it
//! - TLS config builders for both roles
//! - The line-echo session run over an established channel

pub mod connection;
pub mod credentials;
pub mod error;
pub mod options;
pub mod session;
pub mod tls;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use connection::SecureSession;
pub use credentials::{Credentials, IdentityCredential, Role, TrustAnchorSet};
pub use error::{CredentialLoadError, PeerAuthorizationError, ProtoError, SessionError};
pub use options::ChannelOptions;
pub use session::{SessionSummary, GREETING};
pub use tls::handshake::{classify_handshake_error, HandshakeFailure};
