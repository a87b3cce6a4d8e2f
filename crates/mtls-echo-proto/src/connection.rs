//! Established, mutually-authenticated TLS channel.
//!
//! After the handshake succeeds, `SecureSession` wraps the tokio-rustls
//! stream and caches the verified peer's DNS names for logging.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::{client, server, TlsStream};
use tracing::{debug, info};

use crate::credentials::Role;
use crate::error::SessionError;
use crate::options::ChannelOptions;
use crate::session::{run_echo_session, SessionSummary};
use crate::tls::cert_extract::dns_names;

/// A TLS stream whose peer passed validation and the authorization policy.
pub struct SecureSession {
    stream: TlsStream<TcpStream>,
    peer_addr: SocketAddr,
    peer_names: Vec<String>,
    role: Role,
}

impl SecureSession {
    /// Wrap the acceptor side of a completed handshake.
    pub fn from_acceptor(stream: server::TlsStream<TcpStream>, peer_addr: SocketAddr) -> Self {
        Self::new(TlsStream::Server(stream), peer_addr, Role::Acceptor)
    }

    /// Wrap the initiator side of a completed handshake.
    pub fn from_initiator(stream: client::TlsStream<TcpStream>, peer_addr: SocketAddr) -> Self {
        Self::new(TlsStream::Client(stream), peer_addr, Role::Initiator)
    }

    fn new(stream: TlsStream<TcpStream>, peer_addr: SocketAddr, role: Role) -> Self {
        let peer_names = stream
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|certs| certs.first())
            .and_then(|leaf| dns_names(leaf).ok())
            .unwrap_or_default();

        Self {
            stream,
            peer_addr,
            peer_names,
            role,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// DNS names on the peer's leaf certificate.
    pub fn peer_names(&self) -> &[String] {
        &self.peer_names
    }

    /// The local side of this session.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Write one raw line (newline included) and flush it.
    pub async fn send_line(&mut self, line: &[u8]) -> Result<(), SessionError> {
        self.stream.write_all(line).await?;
        self.stream.flush().await?;
        debug!(role = %self.role, len = line.len(), "sent line");
        Ok(())
    }

    /// Run the echo exchange to completion and close the channel.
    ///
    /// The TLS stream is shut down whether the exchange succeeded or not.
    pub async fn run_echo(
        mut self,
        options: &ChannelOptions,
    ) -> Result<SessionSummary, SessionError> {
        let outcome = run_echo_session(&mut self.stream, options.idle_timeout).await;

        // The peer may already be gone once the final line is out.
        if let Err(e) = self.stream.shutdown().await {
            debug!(
                role = %self.role,
                peer = %self.peer_addr,
                error = %e,
                "close_notify not delivered"
            );
        }

        let summary = outcome?;
        info!(
            role = %self.role,
            peer = %self.peer_addr,
            received = summary.lines_received,
            sent = summary.lines_sent,
            "session complete"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for SecureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSession")
            .field("peer_addr", &self.peer_addr)
            .field("peer_names", &self.peer_names)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
