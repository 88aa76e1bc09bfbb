use tracing::{debug, info};

use irc_protocol::{Command, Packet, NICK_OK, NICK_TAKEN, NICK_USAGE};

use crate::error::{MoveError, RenameError};
use crate::registry::{Moved, Registry};
use crate::server_types::UserId;

const PONG: &str = "pong\n";
const JOIN_USAGE: &str = "usage: /join <#channel> [password]\n";
const INVALID_CHANNEL: &str = "Attempted to create channel with invalid name\n";
const CHANNEL_LIMIT: &str = "Channel limit reached\n";

// What the channel runtime should do with the sender's reader afterwards
pub enum Disposition {
    Stay,
    Gone,         // sender left the server
    Moved(Moved), // sender is now in another channel
}

// Dispatches one packet from a channel member.
// Runs with the registry lock held, so each command is applied atomically.
pub struct RequestHandler<'a> {
    registry: &'a mut Registry,
    sender: UserId,
}

impl<'a> RequestHandler<'a> {
    pub fn new(registry: &'a mut Registry, sender: UserId) -> Self {
        RequestHandler { registry, sender }
    }

    pub fn handle(mut self, packet: Packet) -> Disposition {
        let command = packet.command();
        debug!("{} sent {}", self.sender, command.verb());

        match command {
            Command::Message => self.message(packet),
            Command::Join { channel, password } => return self.join(channel, password),
            Command::Nickname(nick) => self.nickname(nick),
            Command::Kick(target) => return self.kick(target),
            Command::Mute(target) => self.set_voice(target, false),
            Command::Unmute(target) => self.set_voice(target, true),
            Command::Whois(target) => self.whois(target),
            Command::Ping => self.reply(PONG),
            Command::Quit => {
                self.registry.remove_user(self.sender);
                return Disposition::Gone
            },
            Command::Connect(_) => debug!("Server does not connect anywhere, ignoring {}", self.sender),
        }

        Disposition::Stay
    }

    fn reply(&self, text: &str) {
        if let Some(user) = self.registry.user(self.sender) {
            user.send(Packet::from_server(text));
        }
    }

    // the sender must be the stored admin of the channel it is in, otherwise nothing happens
    fn admin_target(&self, target: Option<String>) -> Option<UserId> {
        if !self.registry.is_admin(self.sender) {
            debug!("{} is not an admin, command dropped", self.sender);
            return None
        }

        let name = target?;
        let found = self.registry.find_user_by_name(&name).map(|u| u.id);
        if found.is_none() {
            debug!("Admin command from {} names unknown user {}", self.sender, name);
        }
        found
    }

    fn message(&self, packet: Packet) {
        let Some(user) = self.registry.user(self.sender) else { return };

        if !user.can_speak || user.channel.is_none() {
            debug!("{} is muted, message dropped", user.name);
            return
        }

        // relayed under the registered name, whatever the client put in the header
        let stamped = Packet::new(user.name.clone(), packet.payload);
        let delivered = self.registry.relay(self.sender, &stamped);
        debug!("Relayed message from {} to {} members", user.name, delivered);
    }

    fn join(self, channel: Option<String>, password: Option<String>) -> Disposition {
        let Some(channel) = channel else {
            self.reply(JOIN_USAGE);
            return Disposition::Stay
        };

        match self.registry.move_user(self.sender, &channel, password.as_deref()) {
            Ok(moved) => Disposition::Moved(moved),
            Err(e) => {
                info!("{} could not join {}: {}", self.sender, channel, e);
                match e {
                    MoveError::WrongPassword(name) => self.reply(&format!("Wrong password for {}\n", name)),
                    MoveError::AlreadyMember(name) => self.reply(&format!("Already in {}\n", name)),
                    MoveError::InvalidChannelName(_) => self.reply(INVALID_CHANNEL),
                    MoveError::ChannelsFull(_) => self.reply(CHANNEL_LIMIT),
                    MoveError::UnknownUser => (),
                }
                Disposition::Stay
            },
        }
    }

    fn nickname(&mut self, nick: Option<String>) {
        let Some(nick) = nick else {
            self.reply(NICK_USAGE);
            return
        };

        match self.registry.rename_user(self.sender, &nick) {
            Ok(()) => self.reply(NICK_OK),
            Err(RenameError::Taken(_)) => {
                info!("{} attempted to change nick to existing name {}", self.sender, nick);
                self.reply(NICK_TAKEN)
            },
            Err(RenameError::Invalid(_)) => self.reply(NICK_USAGE),
            Err(RenameError::UnknownUser) => (),
        }
    }

    fn kick(self, target: Option<String>) -> Disposition {
        let Some(target) = self.admin_target(target) else {
            return Disposition::Stay
        };

        if let Some(kicked) = self.registry.remove_user(target) {
            info!("{} kicked {} from the server", self.sender, kicked.name);
        }

        if target == self.sender {
            Disposition::Gone
        } else {
            Disposition::Stay
        }
    }

    fn set_voice(&mut self, target: Option<String>, can_speak: bool) {
        let Some(target) = self.admin_target(target) else { return };

        if self.registry.set_can_speak(target, can_speak) {
            info!("{} set can_speak={} on {}", self.sender, can_speak, target);
        }
    }

    fn whois(&self, target: Option<String>) {
        let Some(target) = self.admin_target(target) else { return };

        let (Some(admin), Some(user)) = (self.registry.user(self.sender), self.registry.user(target)) else {
            return
        };
        if user.channel != admin.channel {
            debug!("whois {} from {}: not in the same channel", user.name, admin.name);
            return
        }

        admin.send(Packet::from_server(&format!("{}\n", user.addr.ip())));
    }
}
