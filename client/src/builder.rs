//! Builder to simplify session construction: connect, name handshake, then
//! split the connection between the reader task and the session's writer

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use irc_protocol::handshake::{self, Verdict};
use irc_protocol::PacketCodec;

use crate::client_reader::{ClientReader, Pending};
use crate::session::Session;
use crate::types::{ClientError, EventTx};

pub struct ClientBuilder {
    name: String,
    stream: Option<TcpStream>,
}

impl ClientBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            stream: None,
        }
    }

    // Connect to remote server
    pub async fn connect(mut self, addr: &str) -> Result<Self, ClientError> {
        debug!("Client starting, connecting to server {:?}", addr);

        let stream = TcpStream::connect(addr).await.map_err(|source| {
            error!("Unable to connect to server");
            ClientError::Connect { addr: addr.to_owned(), source }
        })?;

        self.stream = Some(stream);
        Ok(self)
    }

    // Send our name, a rejection ends the connection here
    pub async fn handshake(mut self) -> Result<Self, ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        handshake::write_name(stream, &self.name).await?;
        match handshake::read_verdict(stream).await? {
            Verdict::Accepted => {
                info!("Registered as {}", self.name);
                Ok(self)
            },
            Verdict::Rejected => {
                info!("Server rejected the name {}", self.name);
                Err(ClientError::Rejected) // dropping the stream closes it
            },
        }
    }

    // Build target structure (Session), spawning its reader task
    pub fn build(self, events: EventTx) -> Result<Session, ClientError> {
        let stream = self.stream.ok_or(ClientError::NotConnected)?;
        let (tcp_read, tcp_write) = stream.into_split();

        let pending: Pending = Arc::new(Mutex::new(None));
        let cancel = CancellationToken::new();

        let reader = ClientReader::new(FramedRead::new(tcp_read, PacketCodec), events, pending.clone(), cancel.clone());
        let handle = ClientReader::spawn(reader);

        Ok(Session::new(FramedWrite::new(tcp_write, PacketCodec), pending, cancel, handle))
    }
}
