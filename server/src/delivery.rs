use std::collections::HashMap;

use futures::SinkExt; // provides send on top of FramedWrite and the Sink trait
use tokio::io::AsyncWrite;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::codec::FramedWrite;
use tracing::{debug, warn};

use irc_protocol::{Packet, PacketCodec};

use crate::server_types::{Outbox, OutboxRx, UserId};

// handles msg delivery back to a single client, one task per connection.
// The task ends once every Outbox clone is dropped (user removed) or a write fails,
// dropping the write half closes our side of the connection.
pub struct Delivery;

impl Delivery {
    pub fn outbox(depth: usize) -> (Outbox, OutboxRx) {
        mpsc::channel(depth)
    }

    pub fn spawn<W>(mut rx: OutboxRx, tcp_write: W) -> tokio::task::JoinHandle<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut fw = FramedWrite::new(tcp_write, PacketCodec);

        tokio::spawn(async move {
            while let Some(packet) = rx.recv().await {
                // FramedWrite keeps writing until the whole frame is out or the socket errors
                if let Err(e) = fw.send(packet).await {
                    debug!("Unable to write to client, closing outbound: {:?}", e);
                    break;
                }
            }
            debug!("Outbound delivery finished");
        })
    }
}

// The channel's outbound readiness set: members whose queue can take another packet
// are write ready, the rest miss the current relay.
#[derive(Default)]
pub struct OutboundSet {
    members: HashMap<UserId, Outbox>,
}

impl OutboundSet {
    pub fn new() -> Self {
        OutboundSet {
            members: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: UserId, outbox: Outbox) {
        self.members.insert(id, outbox);
    }

    pub fn deregister(&mut self, id: UserId) -> bool {
        self.members.remove(&id).is_some()
    }

    // fan out to everyone but the sender, returns how many members took the packet
    pub fn relay(&self, sender: UserId, packet: &Packet) -> usize {
        let mut delivered = 0;

        for (id, outbox) in self.members.iter() {
            if *id == sender { continue } // never echo back to the sender

            match outbox.try_send(packet.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("User {} not ready for writing, relay from {} skipped", id, sender);
                },
                Err(TrySendError::Closed(_)) => {
                    debug!("User {} outbound already closed", id);
                },
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;
    use tokio_util::codec::FramedRead;

    #[test]
    fn relay_skips_the_sender() {
        let mut set = OutboundSet::new();
        let (a_tx, mut a_rx) = Delivery::outbox(4);
        let (b_tx, mut b_rx) = Delivery::outbox(4);
        set.register(UserId(1), a_tx);
        set.register(UserId(2), b_tx);

        let delivered = set.relay(UserId(1), &Packet::new("a", "hi\n"));

        assert_eq!(delivered, 1);
        assert!(a_rx.try_recv().is_err());
        assert_eq!(b_rx.try_recv().unwrap().text(), "hi\n");
    }

    #[test]
    fn full_queue_misses_the_message() {
        let mut set = OutboundSet::new();
        let (slow_tx, mut slow_rx) = Delivery::outbox(1);
        let (fast_tx, mut fast_rx) = Delivery::outbox(4);
        set.register(UserId(2), slow_tx);
        set.register(UserId(3), fast_tx);

        assert_eq!(set.relay(UserId(1), &Packet::new("a", "one")), 2);
        assert_eq!(set.relay(UserId(1), &Packet::new("a", "two")), 1);

        assert_eq!(slow_rx.try_recv().unwrap().text(), "one");
        assert!(slow_rx.try_recv().is_err());
        assert_eq!(fast_rx.try_recv().unwrap().text(), "one");
        assert_eq!(fast_rx.try_recv().unwrap().text(), "two");
    }

    #[test]
    fn deregistered_members_get_nothing() {
        let mut set = OutboundSet::new();
        let (tx, mut rx) = Delivery::outbox(4);
        set.register(UserId(2), tx);
        assert!(set.deregister(UserId(2)));
        assert!(!set.deregister(UserId(2)));

        assert_eq!(set.relay(UserId(1), &Packet::new("a", "lost")), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivery_writes_frames_and_closes_when_dropped() {
        let (client, server) = tokio::io::duplex(256);
        let (tx, rx) = Delivery::outbox(4);
        let handle = Delivery::spawn(rx, server);

        tx.send(Packet::from_server("pong\n")).await.unwrap();
        drop(tx);

        let mut fr = FramedRead::new(client, PacketCodec);
        let packet = fr.next().await.unwrap().unwrap();
        assert_eq!(packet.sender, "server");
        assert_eq!(packet.text(), "pong\n");

        handle.await.unwrap();
        assert!(fr.next().await.is_none()); // write half dropped, clean EOF
    }
}
