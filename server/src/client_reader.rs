use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::net::tcp::OwnedReadHalf;
use tokio_stream::Stream;
use tokio_util::codec::FramedRead;

use irc_protocol::{Packet, PacketCodec, ProtocolError};

// What a member's connection produced since the last wait
#[derive(Debug)]
pub enum Inbound {
    Packet(Packet),
    Closed,               // orderly close on a frame boundary
    Failed(ProtocolError), // transport error or broken frame
}

// Handles server communication from client: one member's inbound half.
// Yields decoded packets, then exactly one Closed/Failed event before ending,
// so the channel's StreamMap reports the hang-up instead of silently dropping the stream.
pub struct ClientReader {
    frames: FramedRead<OwnedReadHalf, PacketCodec>,
    hung_up: bool,
}

impl ClientReader {
    pub fn new(tcp_read: OwnedReadHalf) -> Self {
        Self {
            frames: FramedRead::new(tcp_read, PacketCodec),
            hung_up: false,
        }
    }
}

impl Stream for ClientReader {
    type Item = Inbound;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.hung_up {
            return Poll::Ready(None)
        }

        let event = match ready!(Pin::new(&mut self.frames).poll_next(cx)) {
            Some(Ok(packet)) => return Poll::Ready(Some(Inbound::Packet(packet))),
            Some(Err(e)) => Inbound::Failed(e),
            None => Inbound::Closed,
        };

        self.hung_up = true;
        Poll::Ready(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_stream::StreamExt;
    use tokio_util::codec::FramedWrite;

    async fn pair() -> (TcpStream, ClientReader) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        let (read, _write) = server.into_split();
        (client, ClientReader::new(read))
    }

    #[tokio::test]
    async fn packets_then_a_single_hang_up() {
        let (client, mut reader) = pair().await;
        let mut fw = FramedWrite::new(client, PacketCodec);
        fw.send(Packet::new("alice", "hi\n")).await.unwrap();
        drop(fw);

        match reader.next().await {
            Some(Inbound::Packet(p)) => assert_eq!(p.text(), "hi\n"),
            other => panic!("expected a packet, got {:?}", other),
        }
        assert!(matches!(reader.next().await, Some(Inbound::Closed)));
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn broken_frame_is_a_failure() {
        use tokio::io::AsyncWriteExt;

        let (mut client, mut reader) = pair().await;
        client.write_all(&[5, 0, b'x']).await.unwrap(); // header cut short
        drop(client);

        assert!(matches!(reader.next().await, Some(Inbound::Failed(_))));
        assert!(reader.next().await.is_none());
    }
}
