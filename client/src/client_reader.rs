//! Reads server packets for one session and hands them to the front end.
//!
//! Also the receiving side of a nickname change: the next nickname verdict from
//! the server fulfils the pending confirmation, exactly once.

use std::sync::Arc;

use tokio::select;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt; // provides combinator methods like next on top of FramedRead and Stream trait
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use irc_protocol::Packet;

use crate::types::{Event, EventTx, FrRead};

// confirmation slot for an in flight nickname change
pub type Pending = Arc<Mutex<Option<oneshot::Sender<Packet>>>>;

pub struct ClientReader {
    fr: FrRead,
    events: EventTx,
    pending: Pending,
    cancel: CancellationToken,
}

impl ClientReader {
    pub fn new(fr: FrRead, events: EventTx, pending: Pending, cancel: CancellationToken) -> Self {
        Self { fr, events, pending, cancel }
    }

    pub fn spawn(reader: ClientReader) -> JoinHandle<()> {
        tokio::spawn(reader.run())
    }

    async fn run(mut self) {
        loop {
            select! {
                _ = self.cancel.cancelled() => {
                    debug!("Reader cancelled");
                    return // session closed locally, nothing to report
                }
                value = self.fr.next() => {
                    match value {
                        Some(Ok(packet)) => self.on_packet(packet).await,
                        Some(Err(e)) => {
                            debug!("Client connection closing error: {:?}", e);
                            break;
                        },
                        None => {
                            info!("Server remote has closed");
                            break;
                        },
                    }
                }
            }
        }

        // mark the session closed and wake up a nickname change that will never be answered
        self.cancel.cancel();
        self.pending.lock().await.take();
        let _ = self.events.send(Event::Disconnected);
    }

    async fn on_packet(&mut self, packet: Packet) {
        debug!("received packet from {}", packet.sender);

        if packet.is_nickname_reply() {
            if let Some(waiter) = self.pending.lock().await.take() {
                let _ = waiter.send(packet.clone());
            }
        }

        let _ = self.events.send(Event::Packet(packet));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use irc_protocol::PacketCodec;

    async fn wired() -> (FramedWrite<TcpStream, PacketCodec>, FrRead) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        let (read, _write) = client.into_split();
        (FramedWrite::new(server, PacketCodec), FramedRead::new(read, PacketCodec))
    }

    #[tokio::test]
    async fn nickname_verdict_fulfils_the_pending_confirmation_once() {
        let (mut server, fr) = wired().await;
        let (events, mut rx) = mpsc::unbounded_channel();
        let pending: Pending = Arc::new(Mutex::new(None));
        let (tx, confirm) = oneshot::channel();
        *pending.lock().await = Some(tx);

        let handle = ClientReader::spawn(ClientReader::new(fr, events, pending.clone(), CancellationToken::new()));

        server.send(Packet::new("bob", "not for you\n")).await.unwrap();
        server.send(Packet::from_server("You are now the admin of #book\n")).await.unwrap();
        server.send(Packet::from_server("nick ok :)\n")).await.unwrap();
        server.send(Packet::from_server("pong\n")).await.unwrap();

        assert_eq!(confirm.await.unwrap().text(), "nick ok :)\n");
        assert!(pending.lock().await.is_none());

        for expected in ["not for you\n", "You are now the admin of #book\n", "nick ok :)\n", "pong\n"] {
            match rx.recv().await {
                Some(Event::Packet(p)) => assert_eq!(p.text(), expected),
                other => panic!("unexpected {:?}", other),
            }
        }

        drop(server);
        assert_eq!(rx.recv().await, Some(Event::Disconnected));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_stops_the_reader_quietly() {
        let (_server, fr) = wired().await;
        let (events, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = ClientReader::spawn(ClientReader::new(fr, events, Arc::new(Mutex::new(None)), cancel.clone()));
        cancel.cancel();

        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
