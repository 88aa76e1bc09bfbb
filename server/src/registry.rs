//! Users and channels known to the server.
//!
//! Every mutation here happens while the caller holds the single registry lock
//! ([`Shared`](crate::server_types::Shared)), so an add, remove or move is observed
//! by other channel runtimes either entirely or not at all. Entries are keyed by
//! stable ids; removing one never disturbs the ids (or readiness registrations)
//! of the others.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use irc_protocol::{valid_channel_name, valid_nickname, Packet};

use crate::client_reader::ClientReader;
use crate::config::ServerConfig;
use crate::delivery::OutboundSet;
use crate::error::{AdmitError, MoveError, RenameError};
use crate::names::Names;
use crate::server_channel::{Membership, MembershipRx, MembershipTx};
use crate::server_types::{ChannelId, Outbox, UserId, MAIN_CHANNEL};

const NEW_ADMIN: &str = "You are now the admin of {}\n";

pub struct User {
    pub id: UserId,
    pub name: String,
    pub addr: SocketAddr,
    pub channel: Option<ChannelId>,
    pub can_speak: bool,
    outbox: Outbox,
}

impl User {
    // queue a packet for this user only, false if it could not be queued
    pub fn send(&self, packet: Packet) -> bool {
        match self.outbox.try_send(packet) {
            Ok(()) => true,
            Err(e) => {
                warn!("Unable to queue packet for {}: {}", self.name, e);
                false
            }
        }
    }
}

pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub admin: UserId,
    password: Option<String>,
    members: Vec<UserId>, // join order, oldest first
    inbound: MembershipTx,
    outbound: OutboundSet,
}

impl Channel {
    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    fn accepts(&self, password: Option<&str>) -> bool {
        match self.password.as_deref() {
            None => true,
            Some(expected) => password == Some(expected),
        }
    }

    fn add(&mut self, user: &User) {
        self.members.push(user.id);
        self.outbound.register(user.id, user.outbox.clone());
    }

    fn remove(&mut self, id: UserId) {
        self.members.retain(|m| *m != id);
        self.outbound.deregister(id);
    }
}

// A channel that was just created and still needs its runtime spawned
pub struct NewChannel {
    pub id: ChannelId,
    pub name: String,
    pub membership: MembershipRx,
}

pub struct Admitted {
    pub user: UserId,
    pub channel: ChannelId,
    pub created: Option<NewChannel>,
}

pub struct Moved {
    pub to: ChannelId,
    pub created: Option<NewChannel>,
}

pub struct Registry {
    users: HashMap<UserId, User>,
    channels: HashMap<ChannelId, Channel>,
    names: Names,
    next_user: u64,
    next_channel: u64,
    max_users: usize,
    max_channels: usize,
}

impl Registry {
    pub fn new(max_users: usize, max_channels: usize) -> Self {
        Registry {
            users: HashMap::new(),
            channels: HashMap::new(),
            names: Names::new(),
            next_user: 1,
            next_channel: 1,
            max_users,
            max_channels,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Registry::new(config.max_users, config.max_channels)
    }

    /* lookups */

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn find_user_by_name(&self, name: &str) -> Option<&User> {
        self.names.get(name).and_then(|id| self.users.get(&id))
    }

    pub fn find_channel_by_name(&self, name: &str) -> Option<&Channel> {
        self.channels.values().find(|c| c.name == name)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    // a sender is admin iff it is the stored admin of its current channel
    pub fn is_admin(&self, id: UserId) -> bool {
        self.users
            .get(&id)
            .and_then(|u| u.channel)
            .and_then(|c| self.channels.get(&c))
            .map_or(false, |c| c.admin == id)
    }

    /* admission */

    // Admit a freshly handshaken connection and place it in the default channel,
    // creating that channel (with this user as admin) if nobody holds it.
    pub fn admit(&mut self, name: &str, addr: SocketAddr, outbox: Outbox) -> Result<Admitted, AdmitError> {
        if !valid_nickname(name) {
            return Err(AdmitError::InvalidName(name.to_owned()))
        }
        if self.names.contains(name) {
            return Err(AdmitError::NameTaken(name.to_owned()))
        }
        if self.users.len() >= self.max_users {
            return Err(AdmitError::ServerFull(self.max_users))
        }

        let main = self.find_channel_by_name(MAIN_CHANNEL).map(|c| c.id);
        if main.is_none() && self.channels.len() >= self.max_channels {
            return Err(AdmitError::NoDefaultChannel)
        }

        let id = UserId(self.next_user);
        self.next_user += 1;
        self.names.insert(name, id);
        self.users.insert(id, User {
            id,
            name: name.to_owned(),
            addr,
            channel: None,
            can_speak: true,
            outbox,
        });
        info!("User {} ({}) admitted from {}", name, id, addr);

        let admitted = match main {
            Some(channel) => {
                self.join_existing(id, channel);
                Admitted { user: id, channel, created: None }
            },
            None => {
                let created = self.create_channel(MAIN_CHANNEL, id, None);
                Admitted { user: id, channel: created.id, created: Some(created) }
            },
        };

        Ok(admitted)
    }

    // hand a member's inbound half to the runtime of its channel
    pub fn attach(&self, channel: ChannelId, user: UserId, reader: ClientReader) {
        if let Some(c) = self.channels.get(&channel) {
            if c.inbound.send(Membership::Attach(user, reader)).is_err() {
                warn!("Channel {} runtime is gone, {} not attached", c.name, user);
            }
        }
    }

    /* mutation */

    // Remove a user from its channel and from the server. Dropping the returned
    // record drops its outbox, which lets its Delivery task close the connection.
    pub fn remove_user(&mut self, id: UserId) -> Option<User> {
        let mut user = self.users.remove(&id)?;
        self.names.remove(&user.name, id);

        if let Some(channel) = user.channel.take() {
            if let Some(c) = self.channels.get(&channel) {
                let _ = c.inbound.send(Membership::Detach(id)); // runtime drops the reader
            }
            self.leave_channel(id, channel);
        }

        info!("{} has left the server", user.name);
        Some(user)
    }

    // Move a user into the named channel, creating it when it does not exist.
    // The user only leaves its current channel once it is in the new one.
    pub fn move_user(&mut self, id: UserId, target: &str, password: Option<&str>) -> Result<Moved, MoveError> {
        let from = self.users.get(&id).ok_or(MoveError::UnknownUser)?.channel;

        let moved = match self.find_channel_by_name(target).map(|c| c.id) {
            Some(to) => {
                if from == Some(to) {
                    return Err(MoveError::AlreadyMember(target.to_owned()))
                }
                if !self.channels[&to].accepts(password) {
                    info!("{} tried to join {} with a wrong password", id, target);
                    return Err(MoveError::WrongPassword(target.to_owned()))
                }
                self.join_existing(id, to);
                Moved { to, created: None }
            },
            None => {
                if !valid_channel_name(target) {
                    return Err(MoveError::InvalidChannelName(target.to_owned()))
                }
                // leaving a channel we are alone in frees its slot
                let freed = from
                    .and_then(|c| self.channels.get(&c))
                    .map_or(0, |c| usize::from(c.members.len() == 1));
                if self.channels.len() - freed >= self.max_channels {
                    return Err(MoveError::ChannelsFull(self.max_channels))
                }
                let created = self.create_channel(target, id, password);
                Moved { to: created.id, created: Some(created) }
            },
        };

        if let Some(old) = from {
            self.leave_channel(id, old);
        }
        if let Some(user) = self.users.get_mut(&id) {
            user.can_speak = true;
        }

        Ok(moved)
    }

    pub fn rename_user(&mut self, id: UserId, new_name: &str) -> Result<(), RenameError> {
        if !valid_nickname(new_name) {
            return Err(RenameError::Invalid(new_name.to_owned()))
        }
        let user = self.users.get_mut(&id).ok_or(RenameError::UnknownUser)?;

        if !self.names.rename(&user.name, new_name, id) {
            return Err(RenameError::Taken(new_name.to_owned()))
        }

        info!("{} is now known as {}", user.name, new_name);
        user.name = new_name.to_owned();
        Ok(())
    }

    pub fn set_can_speak(&mut self, id: UserId, can_speak: bool) -> bool {
        match self.users.get_mut(&id) {
            Some(user) => {
                user.can_speak = can_speak;
                true
            },
            None => false,
        }
    }

    // fan a packet out to the sender's channel, everyone but the sender
    pub fn relay(&self, sender: UserId, packet: &Packet) -> usize {
        self.users
            .get(&sender)
            .and_then(|u| u.channel)
            .and_then(|c| self.channels.get(&c))
            .map_or(0, |c| c.outbound.relay(sender, packet))
    }

    /* channel bookkeeping */

    fn join_existing(&mut self, id: UserId, channel: ChannelId) {
        let (Some(user), Some(c)) = (self.users.get_mut(&id), self.channels.get_mut(&channel)) else {
            return
        };

        c.add(user);
        user.channel = Some(channel);
        info!("{} joined {} (now has {} members)", user.name, c.name, c.members.len());
    }

    fn create_channel(&mut self, name: &str, admin: UserId, password: Option<&str>) -> NewChannel {
        let id = ChannelId(self.next_channel);
        self.next_channel += 1;

        let (inbound, membership) = mpsc::unbounded_channel();
        self.channels.insert(id, Channel {
            id,
            name: name.to_owned(),
            admin,
            password: password.map(str::to_owned),
            members: Vec::new(),
            inbound,
            outbound: OutboundSet::new(),
        });
        info!("New channel {} ({}) created by {}", name, id, admin);

        self.join_existing(admin, id);
        NewChannel { id, name: name.to_owned(), membership }
    }

    // Drop a member from a channel. The last member leaving destroys the channel
    // in the same critical section; an admin leaving hands the role to the oldest member.
    fn leave_channel(&mut self, id: UserId, channel: ChannelId) {
        let Some(c) = self.channels.get_mut(&channel) else { return };
        c.remove(id);
        debug!("{} left {} (now has {} members)", id, c.name, c.members.len());

        if c.members.is_empty() {
            info!("Deleting channel {} ({})", c.name, c.id);
            // dropping the record closes the runtime's membership feed
            self.channels.remove(&channel);
            return
        }

        if c.admin == id {
            c.admin = c.members[0];
            let notice = NEW_ADMIN.replace("{}", &c.name);
            if let Some(heir) = self.users.get(&c.admin) {
                info!("{} is the new admin of {}", heir.name, c.name);
                heir.send(Packet::from_server(&notice));
            }
        }

        if let Some(user) = self.users.get_mut(&id) {
            if user.channel == Some(channel) {
                user.channel = None;
            }
        }
    }
}
