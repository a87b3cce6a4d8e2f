//! Credential Store: the identities and trust anchors loaded at startup.
//!
//! Three artifacts are read from a single keys directory, once, before either
//! role runs:
//!
//! - the initiator identity (`initiator.crt` + `initiator.key`)
//! - the acceptor identity (`acceptor.crt` + `acceptor.key`)
//! - the trust anchor set (`ca.pem`)
//!
//! The resulting [`Credentials`] value is immutable. Endpoints borrow the
//! identity they present and share the trust anchors through an `Arc`.

pub mod anchors;
pub mod identity;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

pub use anchors::{load_trust_anchors, TrustAnchorSet};
pub use identity::{load_identity, IdentityCredential};

use crate::error::CredentialLoadError;

/// File holding the trust anchor certificates.
pub const TRUST_ANCHORS_FILE: &str = "ca.pem";

/// Which side of the connection a process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Listens for connections (TLS server).
    Acceptor,
    /// Dials out (TLS client).
    Initiator,
}

impl Role {
    /// PEM certificate file for this role's identity.
    pub fn cert_file(self) -> &'static str {
        match self {
            Role::Acceptor => "acceptor.crt",
            Role::Initiator => "initiator.crt",
        }
    }

    /// PEM private key file for this role's identity.
    pub fn key_file(self) -> &'static str {
        match self {
            Role::Acceptor => "acceptor.key",
            Role::Initiator => "initiator.key",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Acceptor => "acceptor",
            Role::Initiator => "initiator",
        })
    }
}

/// Everything the process needs to authenticate itself and its peers.
#[derive(Debug)]
pub struct Credentials {
    initiator: IdentityCredential,
    acceptor: IdentityCredential,
    trust_anchors: Arc<TrustAnchorSet>,
}

impl Credentials {
    /// Load both identities and the trust anchors from `dir`.
    ///
    /// Fails on the first artifact that cannot be loaded; there is no
    /// partially loaded state.
    pub fn load(dir: &Path) -> Result<Self, CredentialLoadError> {
        let initiator = load_role_identity(dir, Role::Initiator)?;
        let acceptor = load_role_identity(dir, Role::Acceptor)?;
        let trust_anchors = load_trust_anchors(&dir.join(TRUST_ANCHORS_FILE))?;

        info!(
            dir = %dir.display(),
            anchors = trust_anchors.len(),
            "credentials loaded"
        );

        Ok(Self {
            initiator,
            acceptor,
            trust_anchors: Arc::new(trust_anchors),
        })
    }

    /// The identity presented when playing `role`.
    pub fn identity(&self, role: Role) -> &IdentityCredential {
        match role {
            Role::Acceptor => &self.acceptor,
            Role::Initiator => &self.initiator,
        }
    }

    /// Shared handle to the trust anchor set.
    pub fn trust_anchors(&self) -> Arc<TrustAnchorSet> {
        Arc::clone(&self.trust_anchors)
    }
}

fn load_role_identity(dir: &Path, role: Role) -> Result<IdentityCredential, CredentialLoadError> {
    load_identity(&dir.join(role.cert_file()), &dir.join(role.key_file()))
}
