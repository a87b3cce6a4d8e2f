//! Throw-away PKI for tests.
//!
//! Generates a root CA, optional intermediate CAs and leaf identities with
//! chosen DNS names using `rcgen`, and can lay them out as a keys directory
//! the way [`Credentials::load`](crate::credentials::Credentials::load)
//! expects. Not for production use: every panic here is a broken fixture.

use std::path::Path;

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose,
};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tempfile::TempDir;

use crate::credentials::{IdentityCredential, Role, TrustAnchorSet, TRUST_ANCHORS_FILE};

/// A certificate authority plus everything needed to issue from it.
pub struct TestPki {
    cert: Certificate,
    key: KeyPair,
    /// DER of the root this authority chains to.
    root_der: CertificateDer<'static>,
    /// PEM of the root this authority chains to.
    root_pem: String,
    /// Intermediates between an issued leaf and the root, nearest first.
    chain: Vec<(CertificateDer<'static>, String)>,
}

/// A leaf certificate (plus any intermediates) and its private key.
pub struct IssuedIdentity {
    /// Leaf first, then intermediates.
    pub chain: Vec<CertificateDer<'static>>,
    /// PEM of `chain`, concatenated in the same order.
    pub cert_pem: String,
    pub key_pem: String,
    key_der: Vec<u8>,
}

impl IssuedIdentity {
    pub fn leaf(&self) -> &CertificateDer<'static> {
        &self.chain[0]
    }

    pub fn intermediates(&self) -> &[CertificateDer<'static>] {
        &self.chain[1..]
    }

    pub fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.clone()))
    }

    pub fn to_credential(&self) -> IdentityCredential {
        IdentityCredential::new(self.chain.clone(), self.private_key())
            .expect("fixture key matches its certificate")
    }
}

impl TestPki {
    /// A fresh self-signed root CA.
    pub fn new() -> Self {
        let key = KeyPair::generate().expect("generate CA key");
        let cert = ca_params("mtls-echo test root")
            .self_signed(&key)
            .expect("self-sign CA");
        let root_der = cert.der().clone();
        let root_pem = cert.pem();
        Self {
            cert,
            key,
            root_der,
            root_pem,
            chain: Vec::new(),
        }
    }

    /// An intermediate CA issued by this authority. Leaves it issues present
    /// the intermediate alongside themselves.
    pub fn intermediate(&self, common_name: &str) -> TestPki {
        let key = KeyPair::generate().expect("generate intermediate key");
        let cert = ca_params(common_name)
            .signed_by(&key, &self.cert, &self.key)
            .expect("sign intermediate");

        let mut chain = vec![(cert.der().clone(), cert.pem())];
        chain.extend(self.chain.iter().cloned());

        TestPki {
            cert,
            key,
            root_der: self.root_der.clone(),
            root_pem: self.root_pem.clone(),
            chain,
        }
    }

    /// Issue a leaf whose DNS SANs are `names`.
    pub fn issue(&self, names: &[&str]) -> IssuedIdentity {
        self.issue_with(leaf_params(names))
    }

    /// Issue a leaf whose validity window ended in 2001.
    pub fn issue_expired(&self, names: &[&str]) -> IssuedIdentity {
        let mut params = leaf_params(names);
        params.not_before = rcgen::date_time_ymd(2000, 1, 1);
        params.not_after = rcgen::date_time_ymd(2001, 1, 1);
        self.issue_with(params)
    }

    /// A self-signed leaf unrelated to any authority.
    pub fn self_signed(names: &[&str]) -> IssuedIdentity {
        let key = KeyPair::generate().expect("generate leaf key");
        let cert = leaf_params(names).self_signed(&key).expect("self-sign leaf");
        IssuedIdentity {
            chain: vec![cert.der().clone()],
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
            key_der: key.serialize_der(),
        }
    }

    fn issue_with(&self, params: CertificateParams) -> IssuedIdentity {
        let key = KeyPair::generate().expect("generate leaf key");
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .expect("sign leaf");

        let mut chain = vec![cert.der().clone()];
        let mut cert_pem = cert.pem();
        for (der, pem) in &self.chain {
            chain.push(der.clone());
            cert_pem.push_str(pem);
        }

        IssuedIdentity {
            chain,
            cert_pem,
            key_pem: key.serialize_pem(),
            key_der: key.serialize_der(),
        }
    }

    pub fn root_der(&self) -> &CertificateDer<'static> {
        &self.root_der
    }

    pub fn root_pem(&self) -> &str {
        &self.root_pem
    }

    /// Trust anchor set holding only this PKI's root.
    pub fn trust_anchors(&self) -> TrustAnchorSet {
        TrustAnchorSet::from_certificates(vec![self.root_der.clone()])
    }

    /// A temporary keys directory with both identities and `ca.pem`.
    pub fn keys_dir(&self, initiator_names: &[&str], acceptor_names: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().expect("create temp keys dir");
        write_identity(dir.path(), Role::Initiator, &self.issue(initiator_names));
        write_identity(dir.path(), Role::Acceptor, &self.issue(acceptor_names));
        std::fs::write(dir.path().join(TRUST_ANCHORS_FILE), &self.root_pem).expect("write ca.pem");
        dir
    }
}

impl Default for TestPki {
    fn default() -> Self {
        Self::new()
    }
}

/// Write (or overwrite) `role`'s certificate and key files in `dir`.
pub fn write_identity(dir: &Path, role: Role, identity: &IssuedIdentity) {
    std::fs::write(dir.join(role.cert_file()), &identity.cert_pem).expect("write certificate");
    std::fs::write(dir.join(role.key_file()), &identity.key_pem).expect("write key");
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("empty SAN list");
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params
}

fn leaf_params(names: &[&str]) -> CertificateParams {
    let sans: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    let mut params = CertificateParams::new(sans).expect("valid SAN list");
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, names.first().copied().unwrap_or("anonymous peer"));
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
    ];
    params
}
