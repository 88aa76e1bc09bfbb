// Command verbs typed by users, the same table is used by the client to decide
// what to send and by the server to decide what to do with it

use crate::{MAX_NAME_LEN, SERVER_NAME};

const COMMAND_MARKER: char = '/';
const CHANNEL_MARKER: char = '#';
const CHANNEL_SEPARATOR: char = ',';
const MAX_CHANNEL_NAME_LEN: usize = 199;

const CMD_CONNECT: &str = "/connect";
const CMD_QUIT: &str = "/quit";
const CMD_PING: &str = "/ping";
const CMD_JOIN: &str = "/join";
const CMD_NICKNAME: &str = "/nickname";
const CMD_KICK: &str = "/kick";
const CMD_MUTE: &str = "/mute";
const CMD_UNMUTE: &str = "/unmute";
const CMD_WHOIS: &str = "/whois";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect(Option<String>), // server address
    Quit,
    Ping,
    Join {
        channel: Option<String>,
        password: Option<String>,
    },
    Nickname(Option<String>),
    Kick(Option<String>),
    Mute(Option<String>),
    Unmute(Option<String>),
    Whois(Option<String>),
    Message, // default when no verb is recognized
}

impl Command {
    pub fn parse(text: &str) -> Command {
        let text = text.trim_start_matches(' ');
        if !text.starts_with(COMMAND_MARKER) {
            return Command::Message
        }

        let mut tokens = text.split_whitespace();
        let verb = tokens.next().unwrap_or_default();
        let mut arg = || tokens.next().map(str::to_owned);

        match verb {
            CMD_CONNECT => Command::Connect(arg()),
            CMD_QUIT => Command::Quit,
            CMD_PING => Command::Ping,
            CMD_JOIN => {
                let channel = arg();
                let password = arg();
                Command::Join { channel, password }
            },
            CMD_NICKNAME => Command::Nickname(arg()),
            CMD_KICK => Command::Kick(arg()),
            CMD_MUTE => Command::Mute(arg()),
            CMD_UNMUTE => Command::Unmute(arg()),
            CMD_WHOIS => Command::Whois(arg()),
            _ => Command::Message, // unrecognized verbs are plain text
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Command::Connect(_) => CMD_CONNECT,
            Command::Quit => CMD_QUIT,
            Command::Ping => CMD_PING,
            Command::Join { .. } => CMD_JOIN,
            Command::Nickname(_) => CMD_NICKNAME,
            Command::Kick(_) => CMD_KICK,
            Command::Mute(_) => CMD_MUTE,
            Command::Unmute(_) => CMD_UNMUTE,
            Command::Whois(_) => CMD_WHOIS,
            Command::Message => "message",
        }
    }
}

// channel names start with '#' and never contain ','
pub fn valid_channel_name(name: &str) -> bool {
    name.starts_with(CHANNEL_MARKER)
        && !name.contains(CHANNEL_SEPARATOR)
        && name.len() <= MAX_CHANNEL_NAME_LEN
}

// nicknames fit the packet name field, can be addressed by admin commands
// and never pass for the server itself
pub fn valid_nickname(name: &str) -> bool {
    !name.is_empty()
        && name != SERVER_NAME
        && name.len() <= MAX_NAME_LEN
        && !name.chars().any(|c| c.is_whitespace() || c == '\0')
}
