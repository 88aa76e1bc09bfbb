//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use irc_protocol::SERVER_PORT;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the admission loop listens on.
    pub addr: SocketAddr,

    /// Maximum number of connected users, further handshakes are rejected.
    pub max_users: usize,

    /// Maximum number of live channels, further creations are refused.
    pub max_channels: usize,

    /// How long a new connection has to send its name.
    pub handshake_timeout: Duration,

    /// Depth of each connection's outbound queue.
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, SERVER_PORT)),
            max_users: 64,
            max_channels: 16,
            handshake_timeout: Duration::from_secs(10),
            outbound_queue: 64,
        }
    }
}

impl ServerConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Default::default()
        }
    }

    pub fn with_max_users(mut self, max: usize) -> Self {
        self.max_users = max;
        self
    }

    pub fn with_max_channels(mut self, max: usize) -> Self {
        self.max_channels = max;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_outbound_queue(mut self, depth: usize) -> Self {
        self.outbound_queue = depth.max(1); // mpsc needs a non zero bound
        self
    }
}
