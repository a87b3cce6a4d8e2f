//! Integration tests: acceptor and initiator over loopback TCP.
//!
//! Each test builds a throw-away PKI, binds an acceptor on 127.0.0.1:0 and
//! drives an initiator against it.
//!
//! Run with `--nocapture` and `RUST_LOG=debug` to see the line trace:
//! ```sh
//! cargo test -p mtls-echo-acceptor --test connection_test -- --nocapture
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mtls_echo_acceptor::{AcceptorEndpoint, AcceptorError};
use mtls_echo_initiator::{InitiatorEndpoint, InitiatorError};
use mtls_echo_proto::credentials::{Credentials, IdentityCredential, Role};
use mtls_echo_proto::test_support::{IssuedIdentity, TestPki};
use mtls_echo_proto::{ChannelOptions, SessionSummary};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// Init tracing subscriber (idempotent across tests via try_init).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_target(true)
        .try_init();
}

fn quick_options() -> ChannelOptions {
    ChannelOptions {
        handshake_timeout: Some(Duration::from_secs(5)),
        idle_timeout: Some(Duration::from_secs(5)),
    }
}

async fn bind_acceptor(pki: &TestPki, identity: &IdentityCredential) -> AcceptorEndpoint {
    AcceptorEndpoint::bind(
        "127.0.0.1:0".parse().unwrap(),
        identity,
        Arc::new(pki.trust_anchors()),
        quick_options(),
    )
    .await
    .expect("acceptor binds")
}

fn initiator_for(pki: &TestPki, issued: &IssuedIdentity) -> InitiatorEndpoint {
    InitiatorEndpoint::new(
        &issued.to_credential(),
        Arc::new(pki.trust_anchors()),
        "localhost",
        quick_options(),
    )
    .expect("initiator builds")
}

/// Accept one connection and run its session, returning whatever failed.
fn accept_once(
    acceptor: AcceptorEndpoint,
) -> tokio::task::JoinHandle<Result<SessionSummary, AcceptorError>> {
    tokio::spawn(async move {
        let session = acceptor.accept().await?;
        Ok(session.run_echo(&quick_options()).await?)
    })
}

// ---------------------------------------------------------------------------
// Test: authorized peers complete the echo exchange
// ---------------------------------------------------------------------------

#[tokio::test]
async fn authorized_peers_complete_echo_exchange() {
    init_tracing();

    let pki = TestPki::new();
    let keys = pki.keys_dir(&["localhost"], &["localhost"]);
    let creds = Credentials::load(keys.path()).expect("credentials load");

    let acceptor = AcceptorEndpoint::bind(
        "127.0.0.1:0".parse().unwrap(),
        creds.identity(Role::Acceptor),
        creds.trust_anchors(),
        quick_options(),
    )
    .await
    .unwrap();
    let addr = acceptor.local_addr().unwrap();
    let acceptor_side = accept_once(acceptor);

    let initiator = InitiatorEndpoint::new(
        creds.identity(Role::Initiator),
        creds.trust_anchors(),
        "localhost",
        quick_options(),
    )
    .unwrap();
    let initiator_summary = initiator.run(&addr.to_string()).await.expect("initiator run");
    let acceptor_summary = acceptor_side.await.unwrap().expect("acceptor session");

    assert_eq!(
        initiator_summary,
        SessionSummary {
            lines_received: 6,
            lines_sent: 5
        }
    );
    assert_eq!(
        acceptor_summary,
        SessionSummary {
            lines_received: 6,
            lines_sent: 6
        }
    );
}

// ---------------------------------------------------------------------------
// Test: initiator without `localhost` is rejected by the acceptor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn acceptor_rejects_initiator_with_wrong_name() {
    init_tracing();

    let pki = TestPki::new();
    let acceptor = bind_acceptor(&pki, &pki.issue(&["localhost"]).to_credential()).await;
    let addr = acceptor.local_addr().unwrap();
    let acceptor_side = accept_once(acceptor);

    let initiator = initiator_for(&pki, &pki.issue(&["example.com"]));
    let initiator_result = initiator.run(&addr.to_string()).await;

    let err = acceptor_side.await.unwrap().unwrap_err();
    match &err {
        AcceptorError::PeerRejected(reason) => {
            assert_eq!(reason.reason(), "unauthorized peer [example.com], want localhost")
        }
        other => panic!("expected policy rejection, got {other:?}"),
    }
    assert!(err
        .to_string()
        .contains("unauthorized peer [example.com], want localhost"));

    // Under TLS 1.3 the initiator may finish its half of the handshake and
    // only see the alert on its first read; either way it fails.
    assert!(initiator_result.is_err(), "{initiator_result:?}");
}

// ---------------------------------------------------------------------------
// Test: initiator rejects an acceptor presenting an intermediate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initiator_rejects_acceptor_presenting_intermediate() {
    init_tracing();

    let root = TestPki::new();
    let chained = root.intermediate("issuing CA").issue(&["localhost"]);
    let acceptor = bind_acceptor(&root, &chained.to_credential()).await;
    let addr = acceptor.local_addr().unwrap();
    let acceptor_side = accept_once(acceptor);

    let initiator = initiator_for(&root, &root.issue(&["localhost"]));
    let err = initiator.run(&addr.to_string()).await.unwrap_err();

    match err {
        InitiatorError::PeerRejected(reason) => {
            assert_eq!(reason.reason(), "expected a single certificate, got 2")
        }
        other => panic!("expected policy rejection, got {other:?}"),
    }

    // The acceptor only sees the initiator's alert.
    let acceptor_err = acceptor_side.await.unwrap().unwrap_err();
    assert!(
        matches!(acceptor_err, AcceptorError::Handshake(_)),
        "{acceptor_err:?}"
    );
}

// ---------------------------------------------------------------------------
// Test: expired initiator certificate fails standard validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_initiator_is_a_handshake_failure() {
    init_tracing();

    let pki = TestPki::new();
    let acceptor = bind_acceptor(&pki, &pki.issue(&["localhost"]).to_credential()).await;
    let addr = acceptor.local_addr().unwrap();
    let acceptor_side = accept_once(acceptor);

    let initiator = initiator_for(&pki, &pki.issue_expired(&["localhost"]));
    let _ = initiator.run(&addr.to_string()).await;

    let err = acceptor_side.await.unwrap().unwrap_err();
    assert!(matches!(err, AcceptorError::Handshake(_)), "{err:?}");
}

// ---------------------------------------------------------------------------
// Test: initiator from another PKI fails standard validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn untrusted_initiator_is_a_handshake_failure() {
    init_tracing();

    let pki = TestPki::new();
    let acceptor = bind_acceptor(&pki, &pki.issue(&["localhost"]).to_credential()).await;
    let addr = acceptor.local_addr().unwrap();
    let acceptor_side = accept_once(acceptor);

    let stranger = TestPki::new();
    let initiator = InitiatorEndpoint::new(
        &stranger.issue(&["localhost"]).to_credential(),
        Arc::new(pki.trust_anchors()),
        "localhost",
        quick_options(),
    )
    .unwrap();
    assert!(initiator.run(&addr.to_string()).await.is_err());

    let err = acceptor_side.await.unwrap().unwrap_err();
    assert!(matches!(err, AcceptorError::Handshake(_)), "{err:?}");
}

// ---------------------------------------------------------------------------
// Test: failed and stalled connections do not affect their siblings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn serve_isolates_connections_and_stops_on_cancel() {
    init_tracing();

    let pki = TestPki::new();
    let acceptor = bind_acceptor(&pki, &pki.issue(&["localhost"]).to_credential()).await;
    let addr: SocketAddr = acceptor.local_addr().unwrap();

    let shutdown = CancellationToken::new();
    let server = tokio::spawn(acceptor.serve(shutdown.clone()));

    // Rejected peer.
    let intruder = initiator_for(&pki, &pki.issue(&["example.com"]));
    assert!(intruder.run(&addr.to_string()).await.is_err());

    // A peer that opens TCP and never starts TLS.
    let stalled = TcpStream::connect(addr).await.unwrap();

    // An authorized peer is still served.
    let peer = initiator_for(&pki, &pki.issue(&["localhost"]));
    let summary = peer.run(&addr.to_string()).await.expect("authorized peer served");
    assert_eq!(summary.lines_received, 6);

    // And again, to show the loop keeps going.
    let again = peer.run(&addr.to_string()).await.expect("second session");
    assert_eq!(again, summary);

    shutdown.cancel();
    let served = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("serve stops after cancel")
        .unwrap();
    assert!(served.is_ok(), "{served:?}");
    drop(stalled);
}

// ---------------------------------------------------------------------------
// Test: handshake deadline frees a stalled connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stalled_handshake_times_out() {
    init_tracing();

    let pki = TestPki::new();
    let acceptor = AcceptorEndpoint::bind(
        "127.0.0.1:0".parse().unwrap(),
        &pki.issue(&["localhost"]).to_credential(),
        Arc::new(pki.trust_anchors()),
        ChannelOptions {
            handshake_timeout: Some(Duration::from_millis(100)),
            idle_timeout: None,
        },
    )
    .await
    .unwrap();
    let addr = acceptor.local_addr().unwrap();

    let _stalled = TcpStream::connect(addr).await.unwrap();
    let err = acceptor.accept().await.unwrap_err();
    assert!(matches!(err, AcceptorError::HandshakeTimeout(_)), "{err:?}");
}

// ---------------------------------------------------------------------------
// Test: binding an address already in use fails with the address
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bind_conflict_is_reported() {
    let pki = TestPki::new();
    let identity = pki.issue(&["localhost"]).to_credential();
    let first = bind_acceptor(&pki, &identity).await;
    let addr = first.local_addr().unwrap();

    let err = AcceptorEndpoint::bind(
        addr,
        &identity,
        Arc::new(pki.trust_anchors()),
        ChannelOptions::default(),
    )
    .await
    .err()
    .expect("second bind fails");

    match err {
        AcceptorError::Bind { addr: reported, .. } => assert_eq!(reported, addr),
        other => panic!("expected bind error, got {other:?}"),
    }
}
