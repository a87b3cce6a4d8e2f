//! TCP + TLS server endpoint for the acceptor.
//!
//! `AcceptorEndpoint` binds a TCP listener and completes a mutually
//! authenticated TLS handshake on every connection it accepts. The peer
//! authorization policy runs inside the handshake, so a `SecureSession` is
//! only ever produced for an authorized peer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mtls_echo_proto::credentials::{IdentityCredential, TrustAnchorSet};
use mtls_echo_proto::options::within;
use mtls_echo_proto::tls::config::build_acceptor_tls_config;
use mtls_echo_proto::{classify_handshake_error, ChannelOptions, SecureSession};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AcceptorError, Result};

/// A TCP listener that hands out authorized TLS sessions.
pub struct AcceptorEndpoint {
    listener: TcpListener,
    tls: TlsAcceptor,
    options: ChannelOptions,
}

impl AcceptorEndpoint {
    /// Bind a listener to `addr`.
    ///
    /// `identity` is presented to every initiator; initiators must present a
    /// certificate that validates against `anchors` and passes the peer
    /// policy.
    pub async fn bind(
        addr: SocketAddr,
        identity: &IdentityCredential,
        anchors: Arc<TrustAnchorSet>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let config = build_acceptor_tls_config(identity, anchors)?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AcceptorError::Bind { addr, source })?;

        info!(%addr, "acceptor listening");

        Ok(Self {
            listener,
            tls: TlsAcceptor::from(Arc::new(config)),
            options,
        })
    }

    /// Returns the local address this endpoint is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(AcceptorError::Accept)
    }

    /// Accept the next connection and complete its handshake.
    ///
    /// A failed handshake is returned to the caller; the listener itself is
    /// unaffected.
    pub async fn accept(&self) -> Result<SecureSession> {
        let (tcp, peer) = self.listener.accept().await.map_err(AcceptorError::Accept)?;
        establish(&self.tls, tcp, peer, self.options.handshake_timeout).await
    }

    /// Run the accept loop until `shutdown` fires.
    ///
    /// Each connection gets its own task that performs the handshake and
    /// then the echo session. Per-connection failures are logged and never
    /// stop the loop; a failing `accept` on the listener does.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("shutdown requested, closing listener");
                    return Ok(());
                }

                accepted = self.listener.accept() => {
                    let (tcp, peer) = accepted.map_err(AcceptorError::Accept)?;
                    debug!(%peer, "new connection");

                    let tls = self.tls.clone();
                    let options = self.options;
                    tokio::spawn(async move {
                        match handle_connection(tls, tcp, peer, options).await {
                            Ok(()) => debug!(%peer, "connection closed"),
                            Err(e) => warn!(%peer, error = %e, "connection failed"),
                        }
                    });
                }
            }
        }
    }
}

async fn handle_connection(
    tls: TlsAcceptor,
    tcp: TcpStream,
    peer: SocketAddr,
    options: ChannelOptions,
) -> Result<()> {
    let session = establish(&tls, tcp, peer, options.handshake_timeout).await?;
    session.run_echo(&options).await?;
    Ok(())
}

async fn establish(
    tls: &TlsAcceptor,
    tcp: TcpStream,
    peer: SocketAddr,
    limit: Option<Duration>,
) -> Result<SecureSession> {
    let stream = match within(limit, tls.accept(tcp)).await {
        Some(handshake) => handshake.map_err(|e| AcceptorError::from(classify_handshake_error(e)))?,
        None => return Err(AcceptorError::HandshakeTimeout(limit.unwrap_or_default())),
    };

    let session = SecureSession::from_acceptor(stream, peer);
    info!(%peer, names = ?session.peer_names(), "peer authorized");
    Ok(session)
}
