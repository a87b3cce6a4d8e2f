//! rustls verifiers that layer the peer policy over WebPKI validation.
//!
//! `AuthorizingServerVerifier` (initiator side) and
//! `AuthorizingClientVerifier` (acceptor side) first delegate to rustls'
//! WebPKI verifiers built over the shared [`TrustAnchorSet`]: expiry,
//! issuer, key usage and (for servers) the expected name are checked there.
//! Only if that passes is the policy in [`authorizer`](super::authorizer)
//! applied. A policy rejection is returned as `rustls::Error::Other`
//! wrapping the [`PeerAuthorizationError`] so callers can tell it apart
//! from ordinary validation failures.
//!
//! Handshake signature checks are delegated unchanged.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::server::WebPkiClientVerifier;
use rustls::{
    DigitallySignedStruct, DistinguishedName, Error as TlsError, OtherError, SignatureScheme,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

use crate::credentials::TrustAnchorSet;
use crate::error::{PeerAuthorizationError, ProtoError, Result};
use crate::tls::authorizer::authorize_presented;
use crate::tls::crypto_provider;

fn rejection(err: PeerAuthorizationError) -> TlsError {
    TlsError::Other(OtherError(Arc::new(err)))
}

// ---------------------------------------------------------------------------
// Initiator side: verifies the acceptor's certificate
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AuthorizingServerVerifier {
    inner: Arc<dyn ServerCertVerifier>,
    anchors: Arc<TrustAnchorSet>,
}

impl AuthorizingServerVerifier {
    pub fn new(anchors: Arc<TrustAnchorSet>) -> Result<Self> {
        let inner =
            WebPkiServerVerifier::builder_with_provider(anchors.root_store(), crypto_provider())
                .build()
                .map_err(|e| ProtoError::TlsConfiguration(format!("server verifier: {e}")))?;
        Ok(Self { inner, anchors })
    }
}

impl ServerCertVerifier for AuthorizingServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, TlsError> {
        let verified =
            self.inner
                .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)?;
        authorize_presented(end_entity, intermediates, &self.anchors).map_err(rejection)?;
        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

// ---------------------------------------------------------------------------
// Acceptor side: verifies the initiator's certificate
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AuthorizingClientVerifier {
    inner: Arc<dyn ClientCertVerifier>,
    anchors: Arc<TrustAnchorSet>,
}

impl AuthorizingClientVerifier {
    /// Client certificates are mandatory: anonymous clients fail the
    /// handshake before the policy is consulted.
    pub fn new(anchors: Arc<TrustAnchorSet>) -> Result<Self> {
        let inner =
            WebPkiClientVerifier::builder_with_provider(anchors.root_store(), crypto_provider())
                .build()
                .map_err(|e| ProtoError::TlsConfiguration(format!("client verifier: {e}")))?;
        Ok(Self { inner, anchors })
    }
}

impl ClientCertVerifier for AuthorizingClientVerifier {
    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        true
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        self.inner.root_hint_subjects()
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> std::result::Result<ClientCertVerified, TlsError> {
        let verified = self.inner.verify_client_cert(end_entity, intermediates, now)?;
        authorize_presented(end_entity, intermediates, &self.anchors).map_err(rejection)?;
        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{IssuedIdentity, TestPki};

    fn verifiers(pki: &TestPki) -> (AuthorizingClientVerifier, AuthorizingServerVerifier) {
        let anchors = Arc::new(pki.trust_anchors());
        (
            AuthorizingClientVerifier::new(Arc::clone(&anchors)).expect("client verifier"),
            AuthorizingServerVerifier::new(anchors).expect("server verifier"),
        )
    }

    fn as_client(
        verifier: &AuthorizingClientVerifier,
        issued: &IssuedIdentity,
    ) -> std::result::Result<(), TlsError> {
        verifier
            .verify_client_cert(issued.leaf(), issued.intermediates(), UnixTime::now())
            .map(|_| ())
    }

    fn as_server(
        verifier: &AuthorizingServerVerifier,
        issued: &IssuedIdentity,
    ) -> std::result::Result<(), TlsError> {
        let name = ServerName::try_from("localhost").unwrap();
        verifier
            .verify_server_cert(issued.leaf(), issued.intermediates(), &name, &[], UnixTime::now())
            .map(|_| ())
    }

    fn policy_reason(err: &TlsError) -> Option<String> {
        match err {
            TlsError::Other(other) => other
                .0
                .downcast_ref::<PeerAuthorizationError>()
                .map(|e| e.reason().to_string()),
            _ => None,
        }
    }

    #[test]
    fn both_roles_accept_valid_peer() {
        let pki = TestPki::new();
        let (client, server) = verifiers(&pki);
        let issued = pki.issue(&["localhost"]);

        assert!(as_client(&client, &issued).is_ok());
        assert!(as_server(&server, &issued).is_ok());
    }

    #[test]
    fn client_verifier_rejects_wrong_name_by_policy() {
        let pki = TestPki::new();
        let (client, _) = verifiers(&pki);
        let issued = pki.issue(&["example.com"]);

        let err = as_client(&client, &issued).unwrap_err();
        assert_eq!(
            policy_reason(&err).as_deref(),
            Some("unauthorized peer [example.com], want localhost")
        );
    }

    #[test]
    fn both_roles_reject_intermediate_chain_identically() {
        let root = TestPki::new();
        let (client, server) = verifiers(&root);
        let issued = root.intermediate("issuing CA").issue(&["localhost"]);

        let client_err = as_client(&client, &issued).unwrap_err();
        let server_err = as_server(&server, &issued).unwrap_err();

        assert_eq!(
            policy_reason(&client_err).as_deref(),
            Some("expected a single certificate, got 2")
        );
        assert_eq!(policy_reason(&client_err), policy_reason(&server_err));
    }

    #[test]
    fn untrusted_issuer_fails_before_policy() {
        let pki = TestPki::new();
        let (client, server) = verifiers(&pki);
        let stranger = TestPki::new().issue(&["localhost"]);

        let client_err = as_client(&client, &stranger).unwrap_err();
        let server_err = as_server(&server, &stranger).unwrap_err();
        assert_eq!(policy_reason(&client_err), None);
        assert_eq!(policy_reason(&server_err), None);
    }

    #[test]
    fn expired_certificate_fails_before_policy() {
        let pki = TestPki::new();
        let (client, _) = verifiers(&pki);
        let expired = pki.issue_expired(&["localhost"]);

        let err = as_client(&client, &expired).unwrap_err();
        assert!(matches!(err, TlsError::InvalidCertificate(_)), "{err:?}");
    }

    #[test]
    fn client_auth_is_mandatory() {
        let pki = TestPki::new();
        let (client, _) = verifiers(&pki);
        assert!(client.offer_client_auth());
        assert!(client.client_auth_mandatory());
        assert_eq!(client.root_hint_subjects().len(), 1);
    }
}
