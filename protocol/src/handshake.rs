//! Name exchange performed once per connection, before any packet flows.
//!
//! The client writes its name as a NAME_LEN byte, NUL padded buffer and the
//! server answers with one of two fixed markers. A rejected client is expected
//! to close its side of the connection.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{name_field, ProtocolError, NAME_LEN};

pub const VERDICT_LEN: usize = 9;
pub const ACCEPTED: &[u8; VERDICT_LEN] = b"accepted\0";
pub const REJECTED: &[u8; VERDICT_LEN] = b"rejected\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl Verdict {
    pub fn as_bytes(&self) -> &'static [u8; VERDICT_LEN] {
        match self {
            Verdict::Accepted => ACCEPTED,
            Verdict::Rejected => REJECTED,
        }
    }
}

pub async fn write_name<W: AsyncWrite + Unpin>(w: &mut W, name: &str) -> Result<(), ProtocolError> {
    let field = name_field(name)?;
    w.write_all(&field).await?;
    w.flush().await?;
    Ok(())
}

// Reads the full name buffer, a strict utf8 name is required
pub async fn read_name<R: AsyncRead + Unpin>(r: &mut R) -> Result<String, ProtocolError> {
    let mut field = [0u8; NAME_LEN];
    read_full(r, &mut field).await?;

    let end = field.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
    String::from_utf8(field[..end].to_vec())
        .map_err(|e| ProtocolError::InvalidName(String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

pub async fn write_verdict<W: AsyncWrite + Unpin>(w: &mut W, verdict: Verdict) -> Result<(), ProtocolError> {
    w.write_all(verdict.as_bytes()).await?;
    w.flush().await?;
    Ok(())
}

pub async fn read_verdict<R: AsyncRead + Unpin>(r: &mut R) -> Result<Verdict, ProtocolError> {
    let mut reply = [0u8; VERDICT_LEN];
    read_full(r, &mut reply).await?;

    match &reply {
        ACCEPTED => Ok(Verdict::Accepted),
        REJECTED => Ok(Verdict::Rejected),
        other => Err(ProtocolError::UnknownVerdict(other.to_vec())),
    }
}

// read_exact keeps retrying short reads, EOF part way through is a closed peer
async fn read_full<R: AsyncRead + Unpin>(r: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError> {
    match r.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(ProtocolError::Closed),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn name_crosses_the_wire() {
        let (mut client, mut server) = tokio::io::duplex(64);

        write_name(&mut client, "alice").await.unwrap();
        assert_eq!(read_name(&mut server).await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn name_buffer_arriving_in_pieces() {
        let (mut client, mut server) = tokio::io::duplex(8); // forces short reads and writes

        let writer = tokio::spawn(async move {
            write_name(&mut client, "a-name-longer-than-the-pipe").await.unwrap();
        });

        assert_eq!(read_name(&mut server).await.unwrap(), "a-name-longer-than-the-pipe");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn verdicts_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64);

        write_verdict(&mut server, Verdict::Rejected).await.unwrap();
        write_verdict(&mut server, Verdict::Accepted).await.unwrap();

        assert_eq!(read_verdict(&mut client).await.unwrap(), Verdict::Rejected);
        assert_eq!(read_verdict(&mut client).await.unwrap(), Verdict::Accepted);
    }

    #[tokio::test]
    async fn closed_before_name_is_reported() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        assert!(matches!(read_name(&mut server).await, Err(ProtocolError::Closed)));
    }

    #[tokio::test]
    async fn garbage_verdict_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        server.write_all(b"whatever!").await.unwrap();

        assert!(matches!(read_verdict(&mut client).await, Err(ProtocolError::UnknownVerdict(_))));
    }
}
