//! The line-echo exchange run over an established channel.
//!
//! Each side reads a newline-terminated line. A bare `"\n"` ends the
//! session. Otherwise the line minus its first byte is written back; if that
//! remainder is itself a bare `"\n"` the session ends too, since the peer
//! will stop on receiving it. A one-character payload therefore cannot be
//! sent: `"x\n"` is answered with `"\n"` and the exchange is over.
//!
//! The loop is generic over any async byte stream so it can be exercised
//! without TLS.

use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::info;

use crate::error::SessionError;

/// Line the initiator sends first.
pub const GREETING: &[u8] = b"hello world\n";

/// Longest accepted line, newline included.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// How many lines one side received and sent during a session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub lines_received: usize,
    pub lines_sent: usize,
}

/// Run the echo loop until either side sends a bare newline.
///
/// `idle_timeout` bounds the wait for each complete line.
pub async fn run_echo_session<S>(
    stream: &mut S,
    idle_timeout: Option<Duration>,
) -> Result<SessionSummary, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut summary = SessionSummary::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        read_line(&mut reader, &mut line, idle_timeout).await?;
        summary.lines_received += 1;

        info!(
            len = line.len(),
            line = %String::from_utf8_lossy(&line).trim_end(),
            "received line"
        );

        if line.len() == 1 {
            return Ok(summary);
        }

        let reply = &line[1..];
        let writer = reader.get_mut();
        writer.write_all(reply).await?;
        writer.flush().await?;
        summary.lines_sent += 1;

        if reply.len() == 1 {
            return Ok(summary);
        }
    }
}

async fn read_line<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    idle_timeout: Option<Duration>,
) -> Result<(), SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let read = async {
        let mut limited = (&mut *reader).take(MAX_LINE_LEN as u64);
        limited.read_until(b'\n', &mut *line).await
    };

    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .map_err(|_| SessionError::IdleTimeout(limit))??,
        None => read.await?,
    };

    if line.last() == Some(&b'\n') {
        return Ok(());
    }
    if line.len() >= MAX_LINE_LEN {
        return Err(SessionError::LineTooLong {
            limit: MAX_LINE_LEN,
        });
    }
    Err(SessionError::UnexpectedEof {
        buffered: line.len(),
    })
}
