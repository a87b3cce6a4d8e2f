//! Trust anchor set: the roots used to validate peer certificates.
//!
//! The same set validates client certificates on the acceptor and server
//! certificates on the initiator. It keeps both the rustls
//! [`RootCertStore`] (for standard WebPKI validation) and the anchors' DER
//! bytes (for verified-chain construction).

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls_pemfile::Item;
use rustls_pki_types::CertificateDer;
use tracing::{debug, warn};

use crate::error::{Artifact, CredentialLoadError};

/// Root certificates treated as authoritative for peer validation.
#[derive(Debug, Clone)]
pub struct TrustAnchorSet {
    certs: Vec<CertificateDer<'static>>,
    roots: Arc<RootCertStore>,
}

impl TrustAnchorSet {
    /// Build a set from parsed certificates.
    ///
    /// Repeated certificates are kept once. Certificates rustls cannot use as
    /// a trust anchor are skipped with a warning; check
    /// [`is_empty`](Self::is_empty) if at least one is required.
    pub fn from_certificates(certs: impl IntoIterator<Item = CertificateDer<'static>>) -> Self {
        let mut roots = RootCertStore::empty();
        let mut accepted: Vec<CertificateDer<'static>> = Vec::new();

        for cert in certs {
            if accepted.contains(&cert) {
                debug!("skipping duplicate trust anchor");
                continue;
            }
            match roots.add(cert.clone()) {
                Ok(()) => accepted.push(cert),
                Err(e) => warn!(error = %e, "skipping unusable trust anchor"),
            }
        }

        Self {
            certs: accepted,
            roots: Arc::new(roots),
        }
    }

    /// The rustls root store, shared with the WebPKI verifiers.
    pub fn root_store(&self) -> Arc<RootCertStore> {
        Arc::clone(&self.roots)
    }

    /// DER bytes of every anchor, in load order.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certs
    }

    /// Returns `true` if `cert` is byte-for-byte one of the anchors.
    pub fn contains(&self, cert: &[u8]) -> bool {
        self.certs.iter().any(|anchor| anchor.as_ref() == cert)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

/// Load the trust anchor set from a PEM file holding one or more certificates.
///
/// PEM blocks that fail to decode are skipped with a warning, like anchors
/// rustls cannot use. Only an unreadable file or one with no usable
/// certificate is an error.
pub fn load_trust_anchors(path: &Path) -> Result<TrustAnchorSet, CredentialLoadError> {
    let pem =
        fs::read(path).map_err(|e| CredentialLoadError::new(Artifact::TrustAnchors, path, e))?;

    let anchors = TrustAnchorSet::from_certificates(read_pem_certificates(path, &pem));
    if anchors.is_empty() {
        return Err(CredentialLoadError::new(
            Artifact::TrustAnchors,
            path,
            "no valid certificates found",
        ));
    }

    Ok(anchors)
}

fn read_pem_certificates(path: &Path, pem: &[u8]) -> Vec<CertificateDer<'static>> {
    let mut rest = pem;
    let mut certs = Vec::new();

    loop {
        let remaining = rest.len();
        match rustls_pemfile::read_one(&mut rest) {
            Ok(Some(Item::X509Certificate(cert))) => certs.push(cert),
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed PEM block");
                // A failed read that consumed nothing would repeat forever.
                if rest.len() == remaining {
                    break;
                }
            }
        }
    }

    certs
}
