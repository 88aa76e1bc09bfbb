use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use irc_protocol::Packet;

use crate::registry::Registry;

// server type definitions

pub const MAIN_CHANNEL: &str = "#main";

// registry shared across the admission loop and every channel runtime,
// the one coarse lock that serializes adds, removes, moves and channel teardown
pub type Shared = Arc<Mutex<Registry>>;

// write end of a connection's outbound queue, drained by its Delivery task
pub type Outbox = mpsc::Sender<Packet>;
pub type OutboxRx = mpsc::Receiver<Packet>;

// stable handles, never reused while the server runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}
