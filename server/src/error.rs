//! Server error types.

use thiserror::Error;

use irc_protocol::ProtocolError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that end startup or a single connection's admission.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("unable to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("client did not send its name within {0:?}")]
    HandshakeTimeout(std::time::Duration),

    #[error("handshake rejected: {0}")]
    Rejected(#[from] AdmitError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a handshake was answered with the rejection marker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmitError {
    #[error("name {0:?} is already in use")]
    NameTaken(String),

    #[error("invalid name {0:?}")]
    InvalidName(String),

    #[error("user table is full ({0} users)")]
    ServerFull(usize),

    #[error("no channel slot left for the default channel")]
    NoDefaultChannel,
}

/// Why a join could not move the user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("unknown user")]
    UnknownUser,

    #[error("already in {0}")]
    AlreadyMember(String),

    #[error("wrong password for {0}")]
    WrongPassword(String),

    #[error("invalid channel name {0:?}")]
    InvalidChannelName(String),

    #[error("channel table is full ({0} channels)")]
    ChannelsFull(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenameError {
    #[error("unknown user")]
    UnknownUser,

    #[error("invalid nickname {0:?}")]
    Invalid(String),

    #[error("nickname {0:?} is already in use")]
    Taken(String),
}
