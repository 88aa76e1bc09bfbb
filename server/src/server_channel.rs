use tokio::sync::mpsc;
use tokio_stream::{StreamExt, StreamMap};
use tracing::{debug, info, warn};

use crate::client_reader::{ClientReader, Inbound};
use crate::registry::NewChannel;
use crate::request_handler::{Disposition, RequestHandler};
use crate::server_types::{ChannelId, Shared, UserId};

// Changes to a channel's inbound readiness set, sent by registry operations
// running on other tasks (admission, another channel's dispatch)
pub enum Membership {
    Attach(UserId, ClientReader),
    Detach(UserId),
}

pub type MembershipTx = mpsc::UnboundedSender<Membership>;
pub type MembershipRx = mpsc::UnboundedReceiver<Membership>;

// One task per channel. Waits on whichever member has a complete packet and
// dispatches it, exits once the registry has torn the channel down.
pub struct ChannelRuntime {
    id: ChannelId,
    name: String,
    shared: Shared,
    membership: MembershipRx,
    inbound: StreamMap<UserId, ClientReader>,
}

impl ChannelRuntime {
    pub fn spawn(shared: Shared, channel: NewChannel) -> tokio::task::JoinHandle<()> {
        let runtime = ChannelRuntime {
            id: channel.id,
            name: channel.name,
            shared,
            membership: channel.membership,
            inbound: StreamMap::new(),
        };

        tokio::spawn(runtime.run())
    }

    async fn run(mut self) {
        info!("Channel {} ({}) runtime started", self.name, self.id);

        loop {
            tokio::select! {
                biased;

                // membership changes first so a fresh reader is polled in this same cycle
                change = self.membership.recv() => {
                    match change {
                        Some(Membership::Attach(id, reader)) => {
                            debug!("{} attached to {}", id, self.name);
                            self.inbound.insert(id, reader);
                        },
                        Some(Membership::Detach(id)) => {
                            debug!("{} detached from {}", id, self.name);
                            self.inbound.remove(&id);
                        },
                        None => break, // channel record destroyed, no members left
                    }
                },
                Some((id, event)) = self.inbound.next(), if !self.inbound.is_empty() => {
                    self.on_event(id, event).await;
                }
            }
        }

        info!("Channel {} ({}) runtime exiting", self.name, self.id);
    }

    async fn on_event(&mut self, id: UserId, event: Inbound) {
        let shared = self.shared.clone();
        let mut registry = shared.lock().await;

        // the member may have been kicked or moved since its data arrived
        if registry.user(id).and_then(|u| u.channel) != Some(self.id) {
            debug!("Dropping stale reader {} in {}", id, self.name);
            self.inbound.remove(&id);
            return
        }

        match event {
            Inbound::Packet(packet) => {
                match RequestHandler::new(&mut registry, id).handle(packet) {
                    Disposition::Stay => (),
                    Disposition::Gone => {
                        self.inbound.remove(&id);
                    },
                    Disposition::Moved(moved) => {
                        if let Some(created) = moved.created {
                            ChannelRuntime::spawn(self.shared.clone(), created);
                        }
                        // hand the reader over while still holding the lock
                        match self.inbound.remove(&id) {
                            Some(reader) => registry.attach(moved.to, id, reader),
                            None => warn!("{} moved without a reader in {}", id, self.name),
                        }
                    },
                }
            },
            Inbound::Closed => {
                info!("{} hung up", id);
                registry.remove_user(id);
                self.inbound.remove(&id);
            },
            Inbound::Failed(e) => {
                warn!("{} connection failed: {}", id, e);
                registry.remove_user(id);
                self.inbound.remove(&id);
            },
        }
    }
}
