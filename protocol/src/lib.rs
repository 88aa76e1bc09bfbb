use std::borrow::Cow;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

mod command;
mod error;
pub mod handshake;

pub use command::{valid_channel_name, valid_nickname, Command};
pub use error::ProtocolError;

// Packet layout on the wire, no serde or message pack involved:
//
//   [length: u16 LE][sender name: NAME_LEN bytes, NUL padded][payload: length bytes]
//
// length only counts the payload, the name field is always sent in full.
// The length is little endian on every host (the historical format used host order,
// which is the same thing on the x86/arm hosts it ran on).

pub const SERVER_PORT: u16 = 9090;
pub const NAME_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = NAME_LEN - 1; // keep room for the NUL terminator
pub const MSG_LEN: usize = 4096;
pub const SERVER_NAME: &str = "server"; // reserved, never a user nickname

// server verdicts on a /nickname request
pub const NICK_OK: &str = "nick ok :)\n";
pub const NICK_TAKEN: &str = "Attempted to change nick to existing name\n";
pub const NICK_USAGE: &str = "usage: /nickname <nick>\n";

const LENGTH_LEN: usize = 2;
const HEADER_LEN: usize = LENGTH_LEN + NAME_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub sender: String,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(sender: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Packet {
            sender: sender.into(),
            payload: payload.into(),
        }
    }

    // textual reply from the server itself
    pub fn from_server(text: &str) -> Self {
        Packet::new(SERVER_NAME, text.as_bytes().to_vec())
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    pub fn command(&self) -> Command {
        Command::parse(&self.text())
    }

    pub fn is_from_server(&self) -> bool {
        self.sender == SERVER_NAME
    }

    // one of the server's answers to /nickname, other notices don't count
    pub fn is_nickname_reply(&self) -> bool {
        self.is_from_server() && matches!(self.text().as_ref(), NICK_OK | NICK_TAKEN | NICK_USAGE)
    }
}

pub struct PacketCodec; // unit struct

// convert bytes to Packet
impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None)
        }

        let length = u16::from_le_bytes([src[0], src[1]]) as usize;
        if length > MSG_LEN {
            return Err(ProtocolError::PayloadTooLarge { size: length, max: MSG_LEN })
        }

        // wait until the whole frame is buffered, FramedRead keeps reading for us
        let frame_len = HEADER_LEN + length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None)
        }

        src.advance(LENGTH_LEN);
        let name = src.split_to(NAME_LEN);
        let payload = src.split_to(length).to_vec();

        Ok(Some(Packet {
            sender: name_from_field(&name).into_owned(),
            payload,
        }))
    }
}

// Take Packet and convert it to bytes
impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > MSG_LEN {
            return Err(ProtocolError::PayloadTooLarge { size: item.payload.len(), max: MSG_LEN })
        }
        let name = name_field(&item.sender)?;

        dst.reserve(HEADER_LEN + item.payload.len());
        dst.put_u16_le(item.payload.len() as u16);
        dst.put_slice(&name);
        dst.put_slice(&item.payload);
        Ok(())
    }
}

// write a name into the fixed width, NUL padded field
pub fn name_field(name: &str) -> Result<[u8; NAME_LEN], ProtocolError> {
    let bytes = name.as_bytes();
    if bytes.len() > MAX_NAME_LEN {
        return Err(ProtocolError::NameTooLong { size: bytes.len(), max: MAX_NAME_LEN })
    }
    if bytes.contains(&0) {
        return Err(ProtocolError::InvalidName(name.to_owned()))
    }

    let mut field = [0u8; NAME_LEN];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

// read a name back out of the fixed width field, stopping at the first NUL
pub fn name_from_field(field: &[u8]) -> Cow<'_, str> {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end])
}
