use std::time::Duration;

use thiserror::Error;
use tokio::net::tcp;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

use irc_protocol::{Packet, PacketCodec, ProtocolError};

pub type FrRead = FramedRead<tcp::OwnedReadHalf, PacketCodec>;
pub type FrWrite = FramedWrite<tcp::OwnedWriteHalf, PacketCodec>;

// placeholder nickname, not accepted as a real one
pub const DEFAULT_NICK: &str = "guest";

// how long a nickname change waits for the server's answer
pub const NICK_TIMEOUT: Duration = Duration::from_secs(5);

// What the front end has to show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Packet(Packet),
    Notice(String),
    Disconnected,
}

pub type EventTx = mpsc::UnboundedSender<Event>;
pub type EventRx = mpsc::UnboundedReceiver<Event>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("First you need to set a nickname with '/nickname <nick>'.")]
    NicknameRequired,

    #[error("The nickname cannot be '{}'.", DEFAULT_NICK)]
    ReservedNickname,

    #[error("Missing arg - correct usage: '/nickname <nick>'.")]
    NicknameUsage,

    #[error("Invalid nickname {0:?}.")]
    InvalidNickname(String),

    #[error("Nickname not changed: {0}")]
    NicknameRefused(String),

    #[error("No answer from the server about the nickname change.")]
    NicknameTimeout,

    #[error("Missing arg - correct usage: '/connect <server_ip>'.")]
    ConnectUsage,

    #[error("No server to send to, try '/connect <server_ip>' first.")]
    NotConnected,

    #[error("Connection failed - handshake: rejected")]
    Rejected,

    #[error("Unable to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("Failed to send message :/ ({0})")]
    Protocol(#[from] ProtocolError),

    #[error("Server has disconnected")]
    Disconnected,
}
