//! TCP + TLS client endpoint.
//!
//! `InitiatorEndpoint` dials the acceptor, completes the mutually
//! authenticated handshake and drives the echo session, opening it with the
//! greeting line.

use std::sync::Arc;

use mtls_echo_proto::credentials::{IdentityCredential, TrustAnchorSet};
use mtls_echo_proto::options::within;
use mtls_echo_proto::tls::config::build_initiator_tls_config;
use mtls_echo_proto::{
    classify_handshake_error, ChannelOptions, SecureSession, SessionSummary, GREETING,
};
use rustls_pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::info;

use crate::error::{InitiatorError, Result};

/// Name the acceptor's certificate is checked against when none is given.
pub const DEFAULT_SERVER_NAME: &str = "localhost";

/// A TLS client that connects to the acceptor with the initiator identity.
pub struct InitiatorEndpoint {
    connector: TlsConnector,
    server_name: ServerName<'static>,
    options: ChannelOptions,
}

impl InitiatorEndpoint {
    /// Build the client side.
    ///
    /// `server_name` is sent as SNI and checked against the acceptor's
    /// certificate during standard validation.
    pub fn new(
        identity: &IdentityCredential,
        anchors: Arc<TrustAnchorSet>,
        server_name: &str,
        options: ChannelOptions,
    ) -> Result<Self> {
        let config = build_initiator_tls_config(identity, anchors)?;
        let server_name = ServerName::try_from(server_name.to_owned())
            .map_err(|_| InitiatorError::InvalidServerName(server_name.to_owned()))?;

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
            options,
        })
    }

    /// Dial `remote` (`host:port`) and complete the handshake.
    pub async fn connect(&self, remote: &str) -> Result<SecureSession> {
        let tcp = TcpStream::connect(remote)
            .await
            .map_err(|source| InitiatorError::Connect {
                remote: remote.to_owned(),
                source,
            })?;
        let peer = tcp.peer_addr().map_err(|source| InitiatorError::Connect {
            remote: remote.to_owned(),
            source,
        })?;

        let limit = self.options.handshake_timeout;
        let handshake = self.connector.connect(self.server_name.clone(), tcp);
        let stream = match within(limit, handshake).await {
            Some(result) => {
                result.map_err(|e| InitiatorError::from(classify_handshake_error(e)))?
            }
            None => return Err(InitiatorError::HandshakeTimeout(limit.unwrap_or_default())),
        };

        let session = SecureSession::from_initiator(stream, peer);
        info!(%peer, names = ?session.peer_names(), "connected to acceptor");
        Ok(session)
    }

    /// Connect, send the greeting and run the echo session to completion.
    pub async fn run(&self, remote: &str) -> Result<SessionSummary> {
        let mut session = self.connect(remote).await?;
        session.send_line(GREETING).await?;
        Ok(session.run_echo(&self.options).await?)
    }
}
