//! mtls-echo acceptor transport.
//!
//! - TCP listener with mutual-TLS handshakes (client certificate required)
//! - Peer authorization through the shared verifier in `mtls-echo-proto`
//! - One tokio task per connection running the echo session

pub mod endpoint;
pub mod error;

pub use endpoint::AcceptorEndpoint;
pub use error::AcceptorError;
