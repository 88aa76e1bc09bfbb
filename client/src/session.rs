use futures::SinkExt; // provides send on top of FramedWrite and the Sink trait
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use irc_protocol::Packet;

use crate::client_reader::Pending;
use crate::types::{ClientError, FrWrite};

// One live server connection: the write half plus the handles of its reader task
pub struct Session {
    fw: FrWrite,
    pending: Pending,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

impl Session {
    pub fn new(fw: FrWrite, pending: Pending, cancel: CancellationToken, reader: JoinHandle<()>) -> Self {
        Self { fw, pending, cancel, reader }
    }

    pub async fn send(&mut self, sender: &str, text: &str) -> Result<(), ClientError> {
        self.fw.send(Packet::new(sender, text)).await?;
        Ok(())
    }

    // Arm the confirmation slot, the reader fulfils it with the next server packet
    pub async fn expect_reply(&self) -> oneshot::Receiver<Packet> {
        let (tx, rx) = oneshot::channel();
        *self.pending.lock().await = Some(tx);
        rx
    }

    pub async fn disarm(&self) {
        self.pending.lock().await.take();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.reader.is_finished()
    }

    // Stop the reader and hang up, the server treats it as a disconnection
    pub async fn close(self) {
        self.cancel.cancel();
        let _ = self.reader.await;
        debug!("Session closed");
        // fw dropped here, closing our write half
    }
}
