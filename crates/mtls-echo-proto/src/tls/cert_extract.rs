//! Extract fields from X.509 DER certificates.
//!
//! rustls hands verifiers raw DER; the peer policy needs the leaf's DNS
//! subject alternative names, and chain construction needs issuer/subject
//! names and signatures. Parsing is done with `x509-parser`.

use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

use crate::error::{ProtoError, Result};

/// Parse a DER certificate, mapping parse failures to [`ProtoError`].
pub fn parse_certificate(cert_der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| ProtoError::CertificateParse(format!("X.509 parse error: {e}")))?;
    Ok(cert)
}

/// DNS names listed in the certificate's subject alternative name extension.
///
/// A certificate without the extension has no DNS names; the subject common
/// name is not consulted.
pub fn dns_names(cert_der: &[u8]) -> Result<Vec<String>> {
    let cert = parse_certificate(cert_der)?;
    dns_names_of(&cert)
}

pub(crate) fn dns_names_of(cert: &X509Certificate<'_>) -> Result<Vec<String>> {
    let san = cert
        .subject_alternative_name()
        .map_err(|e| ProtoError::CertificateParse(format!("subject alternative name: {e}")))?;

    let Some(san) = san else {
        return Ok(Vec::new());
    };

    Ok(san
        .value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some((*dns).to_string()),
            _ => None,
        })
        .collect())
}

/// Returns `true` if `child`'s issuer name is `parent`'s subject name.
pub fn names_as_issuer(child: &X509Certificate<'_>, parent: &X509Certificate<'_>) -> bool {
    child.issuer().as_raw() == parent.subject().as_raw()
}

/// Returns `true` if `child`'s signature verifies under `parent`'s public key.
pub fn signed_by(child: &X509Certificate<'_>, parent: &X509Certificate<'_>) -> bool {
    child.verify_signature(Some(parent.public_key())).is_ok()
}
