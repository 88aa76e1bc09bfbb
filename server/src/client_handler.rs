use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, info};

use irc_protocol::handshake::{self, Verdict};
use irc_protocol::ProtocolError;

use crate::client_reader::ClientReader;
use crate::config::ServerConfig;
use crate::delivery::Delivery;
use crate::error::{AdmitError, ServerError, ServerResult};
use crate::server_channel::ChannelRuntime;
use crate::server_types::{Shared, UserId};

// Handles the handshake of one freshly accepted connection.
// Lives only until the client is admitted (its halves then belong to the channel
// runtime and the Delivery task) or rejected.
pub struct ClientHandler {
    shared: Shared,
    addr: SocketAddr,
    handshake_timeout: Duration,
    outbound_queue: usize,
}

impl ClientHandler {
    pub fn new(shared: Shared, config: &ServerConfig, addr: SocketAddr) -> Self {
        Self {
            shared,
            addr,
            handshake_timeout: config.handshake_timeout,
            outbound_queue: config.outbound_queue,
        }
    }

    // Spawn a short lived task so a slow handshake never stalls the accept loop
    pub fn spawn(h: ClientHandler, socket: TcpStream) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            match h.register(socket).await {
                Ok(id) => debug!("Connection {} registered as {}", h.addr, id),
                Err(e) => info!("Connection {} not admitted: {}", h.addr, e),
            }
        })
    }

    async fn register(&self, socket: TcpStream) -> ServerResult<UserId> {
        let (mut tcp_read, mut tcp_write) = socket.into_split();

        let name = match self.read_name(&mut tcp_read).await {
            Ok(name) => name,
            Err(ServerError::Protocol(ProtocolError::InvalidName(name))) => {
                let _ = handshake::write_verdict(&mut tcp_write, Verdict::Rejected).await;
                return Err(AdmitError::InvalidName(name).into())
            },
            Err(e) => return Err(e),
        };

        // queue exists before admission so relays reaching us early are kept in order
        let (outbox, rx) = Delivery::outbox(self.outbound_queue);

        let admitted = {
            let mut registry = self.shared.lock().await;

            registry.admit(&name, self.addr, outbox).map(|admitted| {
                if let Some(created) = admitted.created {
                    ChannelRuntime::spawn(self.shared.clone(), created);
                }
                registry.attach(admitted.channel, admitted.user, ClientReader::new(tcp_read));
                admitted.user
            })
        };

        match admitted {
            Ok(id) => {
                handshake::write_verdict(&mut tcp_write, Verdict::Accepted).await?;
                Delivery::spawn(rx, tcp_write);
                info!("{} accepted from {}", name, self.addr);
                Ok(id)
            },
            Err(e) => {
                // the rejected client is expected to hang up, dropping both halves closes ours
                let _ = handshake::write_verdict(&mut tcp_write, Verdict::Rejected).await;
                Err(e.into())
            },
        }
    }

    async fn read_name(&self, tcp_read: &mut OwnedReadHalf) -> ServerResult<String> {
        match time::timeout(self.handshake_timeout, handshake::read_name(tcp_read)).await {
            Ok(name) => Ok(name?),
            Err(_) => Err(ServerError::HandshakeTimeout(self.handshake_timeout)),
        }
    }
}
