use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("name too long: {size} bytes (max: {max})")]
    NameTooLong { size: usize, max: usize },

    #[error("invalid name {0:?}")]
    InvalidName(String),

    #[error("unknown handshake reply {0:?}")]
    UnknownVerdict(Vec<u8>),

    // peer closed the stream before a complete field arrived
    #[error("connection closed by peer")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
