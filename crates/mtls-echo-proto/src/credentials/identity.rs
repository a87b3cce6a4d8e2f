//! Identity credentials: a certificate chain and its matching private key.
//!
//! PEM parsing is done with `rustls-pemfile`; the key is loaded through the
//! ring crypto provider and checked against the leaf's public key so that a
//! mismatched pair fails at startup rather than mid-handshake.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustls::sign::CertifiedKey;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::{Artifact, CredentialLoadError, ProtoError, Result};
use crate::tls::crypto_provider;

/// A certificate chain (leaf first) and the private key for the leaf.
pub struct IdentityCredential {
    cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl IdentityCredential {
    /// Pair an already-parsed chain with its key.
    ///
    /// Fails if the chain is empty, the key type is unsupported or the key
    /// does not belong to the leaf.
    pub fn new(
        cert_chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self> {
        if cert_chain.is_empty() {
            return Err(ProtoError::TlsConfiguration(
                "identity certificate chain is empty".into(),
            ));
        }
        ensure_key_matches(&cert_chain, &key).map_err(ProtoError::TlsConfiguration)?;
        Ok(Self { cert_chain, key })
    }

    /// The chain presented to peers, leaf first.
    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    /// The leaf certificate.
    pub fn leaf(&self) -> &CertificateDer<'static> {
        &self.cert_chain[0]
    }

    /// A fresh copy of the private key, as rustls config builders consume it.
    pub fn private_key(&self) -> PrivateKeyDer<'static> {
        self.key.clone_key()
    }
}

impl fmt::Debug for IdentityCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCredential")
            .field("chain_len", &self.cert_chain.len())
            .finish_non_exhaustive()
    }
}

/// Load an identity from a PEM certificate file and a PEM private key file.
pub fn load_identity(
    cert_path: &Path,
    key_path: &Path,
) -> std::result::Result<IdentityCredential, CredentialLoadError> {
    let cert_chain = read_certificates(cert_path)
        .map_err(|e| CredentialLoadError::new(Artifact::Certificate, cert_path, e))?;
    if cert_chain.is_empty() {
        return Err(CredentialLoadError::new(
            Artifact::Certificate,
            cert_path,
            "no PEM certificates found",
        ));
    }

    let key = read_private_key(key_path)
        .map_err(|e| CredentialLoadError::new(Artifact::PrivateKey, key_path, e))?
        .ok_or_else(|| {
            CredentialLoadError::new(Artifact::PrivateKey, key_path, "no PEM private key found")
        })?;

    ensure_key_matches(&cert_chain, &key)
        .map_err(|reason| CredentialLoadError::new(Artifact::PrivateKey, key_path, reason))?;

    Ok(IdentityCredential { cert_chain, key })
}

/// Read every PEM certificate in `path`, in file order.
fn read_certificates(path: &Path) -> std::io::Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::certs(&mut reader).collect()
}

/// Read the first PEM private key (PKCS#8, PKCS#1 or SEC1) in `path`.
fn read_private_key(path: &Path) -> std::io::Result<Option<PrivateKeyDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::private_key(&mut reader)
}

fn ensure_key_matches(
    cert_chain: &[CertificateDer<'static>],
    key: &PrivateKeyDer<'static>,
) -> std::result::Result<(), String> {
    let signing_key = crypto_provider()
        .key_provider
        .load_private_key(key.clone_key())
        .map_err(|e| format!("unsupported private key: {e}"))?;

    CertifiedKey::new(cert_chain.to_vec(), signing_key)
        .keys_match()
        .map_err(|e| format!("private key does not match certificate: {e}"))
}
