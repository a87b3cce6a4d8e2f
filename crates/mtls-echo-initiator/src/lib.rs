//! mtls-echo initiator transport.
//!
//! - TCP connect with a mutual-TLS handshake presenting the initiator identity
//! - Server verification against the shared trust anchors and peer policy
//! - The greeting-led echo session

pub mod endpoint;
pub mod error;

pub use endpoint::InitiatorEndpoint;
pub use error::InitiatorError;
