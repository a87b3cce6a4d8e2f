//! Runtime settings: built-in defaults plus environment overrides.

use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use mtls_echo_initiator::endpoint::DEFAULT_SERVER_NAME;
use mtls_echo_proto::ChannelOptions;

/// Overrides the keys directory.
pub const KEYS_DIR_ENV: &str = "MTLS_ECHO_KEYS_DIR";

/// Overrides the `host:port` the initiator dials.
pub const REMOTE_ENV: &str = "MTLS_ECHO_REMOTE";

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_LISTEN: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT);
pub const DEFAULT_REMOTE: &str = "localhost:10000";

#[derive(Debug, Clone)]
pub struct Settings {
    pub keys_dir: PathBuf,
    pub listen: SocketAddr,
    pub remote: String,
    /// Name the acceptor's certificate is validated against.
    pub server_name: String,
    pub options: ChannelOptions,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var_os(key))
    }

    fn resolve(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let keys_dir = lookup(KEYS_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_keys_dir);

        let remote = lookup(REMOTE_ENV)
            .and_then(|remote| remote.into_string().ok())
            .filter(|remote| !remote.is_empty())
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());

        Self {
            keys_dir,
            listen: DEFAULT_LISTEN,
            remote,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            options: ChannelOptions::default(),
        }
    }
}

/// `keys/` beside this crate's manifest.
fn default_keys_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("keys")
}
