use std::net::{IpAddr, SocketAddr};

use tokio::time;
use tracing::{debug, info};

use irc_protocol::{valid_nickname, Command, NICK_OK, SERVER_PORT};

use crate::builder::ClientBuilder;
use crate::session::Session;
use crate::types::{ClientError, Event, EventTx, DEFAULT_NICK, NICK_TIMEOUT};

const CONNECTED: &str = "Connected successfully!";

// What the input loop should do after a line was handled
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// Client side state: the local nickname and at most one server session.
// Packets and notices for the user go out through the events channel.
pub struct Client {
    name: String,
    default_port: u16,
    session: Option<Session>,
    events: EventTx,
}

impl Client {
    pub fn new(events: EventTx) -> Self {
        Client {
            name: DEFAULT_NICK.to_owned(),
            default_port: SERVER_PORT,
            session: None,
            events,
        }
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_nickname(&self) -> bool {
        !self.name.is_empty() && self.name != DEFAULT_NICK
    }

    pub fn is_connected(&self) -> bool {
        self.session.as_ref().map_or(false, |s| !s.is_closed())
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Flow, ClientError> {
        if line.trim().is_empty() {
            return Ok(Flow::Continue)
        }

        let command = Command::parse(line);
        let needs_nickname = !matches!(command, Command::Quit | Command::Nickname(_));
        if needs_nickname && !self.has_nickname() {
            return Err(ClientError::NicknameRequired)
        }

        match command {
            Command::Quit => {
                info!("Session terminated by user...");
                self.disconnect().await;
                return Ok(Flow::Quit)
            },
            Command::Connect(addr) => self.connect(addr).await?,
            Command::Nickname(nick) => self.nickname(nick).await?,
            // everything else is the server's business
            _ => self.send(line).await?,
        }

        Ok(Flow::Continue)
    }

    async fn connect(&mut self, addr: Option<String>) -> Result<(), ClientError> {
        let addr = addr.ok_or(ClientError::ConnectUsage)?;
        let addr = with_port(addr, self.default_port);

        self.disconnect().await;

        let session = ClientBuilder::new(&self.name)
            .connect(&addr)
            .await?
            .handshake()
            .await?
            .build(self.events.clone())?;

        self.session = Some(session);
        let _ = self.events.send(Event::Notice(CONNECTED.to_owned()));
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }

    async fn send(&mut self, line: &str) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected)
        }
        let session = self.session.as_mut().ok_or(ClientError::NotConnected)?;

        let mut text = line.to_owned();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        session.send(&self.name, &text).await
    }

    async fn nickname(&mut self, nick: Option<String>) -> Result<(), ClientError> {
        let nick = nick.ok_or(ClientError::NicknameUsage)?;
        if nick == DEFAULT_NICK {
            return Err(ClientError::ReservedNickname)
        }
        if !valid_nickname(&nick) {
            return Err(ClientError::InvalidNickname(nick))
        }

        if self.is_connected() {
            self.confirm_nickname(&nick).await?;
        }

        info!("Nickname is now {}", nick);
        self.name = nick;
        Ok(())
    }

    // Ask the server and wait for its verdict, only NICK_OK renames us
    async fn confirm_nickname(&mut self, nick: &str) -> Result<(), ClientError> {
        let session = self.session.as_mut().ok_or(ClientError::NotConnected)?;

        let reply = session.expect_reply().await;
        if let Err(e) = session.send(&self.name, &format!("/nickname {}\n", nick)).await {
            session.disarm().await;
            return Err(e)
        }

        match time::timeout(NICK_TIMEOUT, reply).await {
            Ok(Ok(packet)) => {
                let text = packet.text();
                debug!("nickname reply: {:?}", text);
                if text == NICK_OK {
                    Ok(())
                } else {
                    Err(ClientError::NicknameRefused(text.trim_end().to_owned()))
                }
            },
            Ok(Err(_)) => Err(ClientError::Disconnected), // reader gone, slot dropped
            Err(_) => {
                session.disarm().await;
                Err(ClientError::NicknameTimeout)
            },
        }
    }
}

// Fill in the default port unless the address already carries one.
// Bare IPv6 literals contain ':' too, so they are recognised before host:port.
fn with_port(addr: String, port: u16) -> String {
    if addr.parse::<SocketAddr>().is_ok() {
        return addr
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return SocketAddr::new(ip, port).to_string()
    }
    if addr.contains(':') { addr } else { format!("{}:{}", addr, port) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn client() -> Client {
        let (events, _rx) = mpsc::unbounded_channel();
        Client::new(events)
    }

    #[tokio::test]
    async fn starts_as_guest_without_a_session() {
        let c = client();
        assert_eq!(c.name(), "guest");
        assert!(!c.has_nickname());
        assert!(!c.is_connected());
    }

    #[tokio::test]
    async fn most_commands_need_a_nickname() {
        let mut c = client();

        for line in ["hello", "/connect 127.0.0.1", "/join #rust", "/ping"] {
            assert!(matches!(c.handle_line(line).await, Err(ClientError::NicknameRequired)));
        }
        assert_eq!(c.handle_line("   ").await.unwrap(), Flow::Continue);
    }

    #[tokio::test]
    async fn nickname_is_local_while_offline() {
        let mut c = client();

        assert!(matches!(c.handle_line("/nickname guest").await, Err(ClientError::ReservedNickname)));
        assert!(matches!(c.handle_line("/nickname").await, Err(ClientError::NicknameUsage)));
        assert_eq!(c.name(), "guest");

        assert_eq!(c.handle_line("/nickname alice").await.unwrap(), Flow::Continue);
        assert_eq!(c.name(), "alice");
        assert!(c.has_nickname());
    }

    #[tokio::test]
    async fn sending_without_a_session_asks_to_connect() {
        let mut c = client();
        c.handle_line("/nickname alice").await.unwrap();

        assert!(matches!(c.handle_line("hi all").await, Err(ClientError::NotConnected)));
        assert!(matches!(c.handle_line("/whois bob").await, Err(ClientError::NotConnected)));
        assert!(matches!(c.handle_line("/connect").await, Err(ClientError::ConnectUsage)));
    }

    #[tokio::test]
    async fn quit_needs_no_nickname() {
        let mut c = client();
        assert_eq!(c.handle_line("/quit").await.unwrap(), Flow::Quit);
    }

    #[test]
    fn default_port_is_added_only_when_missing() {
        assert_eq!(with_port("127.0.0.1".into(), 9090), "127.0.0.1:9090");
        assert_eq!(with_port("127.0.0.1:7000".into(), 9090), "127.0.0.1:7000");
        assert_eq!(with_port("::1".into(), 9090), "[::1]:9090");
        assert_eq!(with_port("[::1]:7000".into(), 9090), "[::1]:7000");
        assert_eq!(with_port("localhost".into(), 9090), "localhost:9090");
        assert_eq!(with_port("localhost:7000".into(), 9090), "localhost:7000");
    }

    #[tokio::test]
    async fn reserved_server_name_is_refused_locally() {
        let mut c = client();
        assert!(matches!(c.handle_line("/nickname server").await, Err(ClientError::InvalidNickname(_))));
        assert_eq!(c.name(), "guest");
    }
}
