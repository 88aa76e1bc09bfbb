use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use irc_client::types::{Event, EventRx};
use irc_client::{Client, ClientError, Flow};
use irc_server::{Server, ServerConfig};

const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    let server = Server::bind(ServerConfig::new("127.0.0.1:0".parse().unwrap())).await.unwrap();
    let addr = server.local_addr().unwrap();
    server.spawn();
    addr
}

async fn online(addr: SocketAddr, nick: &str) -> (Client, EventRx) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client = Client::new(tx);

    client.handle_line(&format!("/nickname {}", nick)).await.unwrap();
    client.handle_line(&format!("/connect {}", addr)).await.unwrap();
    assert_eq!(next_event(&mut rx).await, Event::Notice("Connected successfully!".into()));
    assert!(client.is_connected());

    (client, rx)
}

async fn next_event(rx: &mut EventRx) -> Event {
    timeout(WAIT, rx.recv()).await.expect("timed out").expect("events closed")
}

async fn next_text(rx: &mut EventRx) -> (String, String) {
    match next_event(rx).await {
        Event::Packet(p) => (p.sender.clone(), p.text().into_owned()),
        other => panic!("expected a packet, got {:?}", other),
    }
}

#[tokio::test]
async fn messages_flow_between_two_clients() {
    let addr = start_server().await;
    let (mut alice, mut alice_rx) = online(addr, "alice").await;
    let (mut bob, _bob_rx) = online(addr, "bob").await;

    bob.handle_line("hi alice").await.unwrap();
    assert_eq!(next_text(&mut alice_rx).await, ("bob".into(), "hi alice\n".into()));

    alice.handle_line("/ping").await.unwrap();
    assert_eq!(next_text(&mut alice_rx).await, ("server".into(), "pong\n".into()));
}

#[tokio::test]
async fn taken_name_is_rejected_at_connect() {
    let addr = start_server().await;
    let (_alice, _alice_rx) = online(addr, "alice").await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let mut imposter = Client::new(tx);
    imposter.handle_line("/nickname alice").await.unwrap();

    let res = imposter.handle_line(&format!("/connect {}", addr)).await;
    assert!(matches!(res, Err(ClientError::Rejected)));
    assert!(!imposter.is_connected());
}

#[tokio::test]
async fn nickname_change_waits_for_the_server() {
    let addr = start_server().await;
    let (mut alice, _alice_rx) = online(addr, "alice").await;
    let (mut bob, mut bob_rx) = online(addr, "bob").await;

    let res = bob.handle_line("/nickname alice").await;
    assert!(matches!(res, Err(ClientError::NicknameRefused(_))));
    assert_eq!(bob.name(), "bob");
    // the refusal is still shown to the user
    assert_eq!(next_text(&mut bob_rx).await.1, "Attempted to change nick to existing name\n");

    bob.handle_line("/nickname robert").await.unwrap();
    assert_eq!(bob.name(), "robert");
    assert_eq!(next_text(&mut bob_rx).await.1, "nick ok :)\n");

    alice.handle_line("who is there").await.unwrap();
    assert_eq!(next_text(&mut bob_rx).await, ("alice".into(), "who is there\n".into()));
}

#[tokio::test]
async fn quit_ends_the_session_and_frees_the_name() {
    let addr = start_server().await;
    let (mut alice, _alice_rx) = online(addr, "alice").await;

    assert_eq!(alice.handle_line("/quit").await.unwrap(), Flow::Quit);
    assert!(!alice.is_connected());

    // the server notices the hang up, after which the name can be taken again
    let mut admitted = false;
    for _ in 0..50 {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut again = Client::new(tx);
        again.handle_line("/nickname alice").await.unwrap();
        if again.handle_line(&format!("/connect {}", addr)).await.is_ok() {
            admitted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(admitted);
}

#[tokio::test]
async fn kicked_client_sees_the_disconnect() {
    let addr = start_server().await;
    let (mut alice, _alice_rx) = online(addr, "alice").await;
    let (mut bob, mut bob_rx) = online(addr, "bob").await;

    alice.handle_line("/kick bob").await.unwrap();
    assert_eq!(next_event(&mut bob_rx).await, Event::Disconnected);

    // reader is gone, further input is refused locally
    assert!(matches!(bob.handle_line("hello?").await, Err(ClientError::NotConnected)));
}
