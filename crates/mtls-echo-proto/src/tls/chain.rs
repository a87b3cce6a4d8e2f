//! Verified-chain construction.
//!
//! rustls' WebPKI verifiers decide whether *some* path to a trust anchor
//! exists but do not report which. The peer policy needs the chains
//! themselves, so after standard validation has passed we enumerate every
//! path from the leaf to an anchor over the presented intermediates.
//!
//! An edge `child -> parent` is taken only when the child's issuer name
//! equals the parent's subject name and the child's signature verifies with
//! the parent's key. Signature checks are budgeted so a peer cannot make the
//! search expensive by presenting many same-named intermediates. A leaf that
//! is itself an anchor forms the one-element chain `[leaf]` and nothing else
//! is searched.

use rustls_pki_types::CertificateDer;
use tracing::warn;
use x509_parser::prelude::X509Certificate;

use crate::credentials::TrustAnchorSet;
use crate::tls::cert_extract::{names_as_issuer, parse_certificate, signed_by};

/// Longest chain considered, leaf and anchor included.
pub const MAX_CHAIN_LEN: usize = 8;

/// Signature verifications one search may spend before giving up.
pub const MAX_SIGNATURE_CHECKS: usize = 100;

/// A validated path, leaf first and trust anchor last.
pub type VerifiedChain = Vec<CertificateDer<'static>>;

struct Node<'a> {
    der: &'a CertificateDer<'a>,
    cert: X509Certificate<'a>,
}

impl<'a> Node<'a> {
    fn parse(der: &'a CertificateDer<'a>) -> Option<Self> {
        parse_certificate(der).ok().map(|cert| Node { der, cert })
    }
}

/// Enumerate every chain from `end_entity` to a certificate in `anchors`.
///
/// Certificates that fail to parse are ignored; an unparseable leaf yields
/// no chains. The search stops after [`MAX_SIGNATURE_CHECKS`] signature
/// verifications and returns whatever chains it found by then.
pub fn build_verified_chains(
    end_entity: &CertificateDer<'_>,
    intermediates: &[CertificateDer<'_>],
    anchors: &TrustAnchorSet,
) -> Vec<VerifiedChain> {
    build_within_budget(end_entity, intermediates, anchors, MAX_SIGNATURE_CHECKS)
}

fn build_within_budget(
    end_entity: &CertificateDer<'_>,
    intermediates: &[CertificateDer<'_>],
    anchors: &TrustAnchorSet,
    budget: usize,
) -> Vec<VerifiedChain> {
    if anchors.contains(end_entity) {
        return vec![vec![end_entity.clone().into_owned()]];
    }

    let Some(leaf) = Node::parse(end_entity) else {
        return Vec::new();
    };
    let intermediates: Vec<Node<'_>> = intermediates
        .iter()
        .filter_map(|der| Node::parse(der))
        .collect();
    let anchors: Vec<Node<'_>> = anchors
        .certificates()
        .iter()
        .filter_map(|der| Node::parse(der))
        .collect();

    let mut search = Search {
        intermediates: &intermediates,
        anchors: &anchors,
        checks_left: budget,
        exhausted: false,
        chains: Vec::new(),
    };
    let mut path = vec![&leaf];
    search.extend(&mut path);
    search.chains
}

struct Search<'b, 'a> {
    intermediates: &'b [Node<'a>],
    anchors: &'b [Node<'a>],
    checks_left: usize,
    exhausted: bool,
    chains: Vec<VerifiedChain>,
}

impl<'b, 'a> Search<'b, 'a> {
    fn extend(&mut self, path: &mut Vec<&'b Node<'a>>) {
        let Some(tip) = path.last().copied() else {
            return;
        };

        let anchors = self.anchors;
        for anchor in anchors {
            if self.issued_by(tip, anchor) {
                let mut chain: VerifiedChain =
                    path.iter().map(|n| n.der.clone().into_owned()).collect();
                chain.push(anchor.der.clone().into_owned());
                self.chains.push(chain);
            }
        }

        // One slot must stay free for the anchor.
        if path.len() + 1 >= MAX_CHAIN_LEN {
            return;
        }

        let intermediates = self.intermediates;
        for candidate in intermediates {
            if path.iter().any(|n| n.der == candidate.der) {
                continue;
            }
            if self.issued_by(tip, candidate) {
                path.push(candidate);
                self.extend(path);
                path.pop();
            }
        }
    }

    /// Name match first; only a matching pair spends a signature check.
    fn issued_by(&mut self, child: &Node<'a>, parent: &Node<'a>) -> bool {
        if !names_as_issuer(&child.cert, &parent.cert) {
            return false;
        }
        if self.checks_left == 0 {
            if !self.exhausted {
                warn!(
                    limit = MAX_SIGNATURE_CHECKS,
                    "chain search ran out of signature checks"
                );
                self.exhausted = true;
            }
            return false;
        }
        self.checks_left -= 1;
        signed_by(&child.cert, &parent.cert)
    }
}
