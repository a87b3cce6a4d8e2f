//! Deadlines applied to each secure channel.
//!
//! None of these exist in the bare protocol: without them a peer that
//! stalls mid-handshake or never finishes its line holds its task forever.

use std::future::Future;
use std::time::Duration;

/// Default bound on the TLS handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-connection deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Abandon a handshake that has not completed within this time.
    pub handshake_timeout: Option<Duration>,
    /// Abandon a session when no complete line arrives within this time.
    pub idle_timeout: Option<Duration>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            idle_timeout: None,
        }
    }
}

/// Drive `fut` to completion, or give up after `limit`.
///
/// Returns `None` if the deadline passed first. With no limit this simply
/// awaits `fut`.
pub async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}
