use clap::Parser;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, info, Level};
use tracing_subscriber::fmt;

use irc_protocol::SERVER_PORT;
use irc_client::client::{Client, Flow};
use irc_client::input_reader::{self, InputReader};
use irc_client::types::Event;

const GREETINGS: &str = "$ Welcome to chat!\n$ Commands: /nickname <nick>, /connect <server_ip>, /join <#channel> [password], /ping, /quit\n$ Admin commands: /kick, /mute, /unmute, /whois <nick>";

/// irc-client - line based client for irc-server
#[derive(Debug, Parser)]
#[command(name = "irc-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port used by /connect when the address has none
    #[arg(long, short, default_value_t = SERVER_PORT)]
    port: u16,

    /// Enable debug output
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    fmt()
        .compact() // use abbreviated log format
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr) // keep stdout for the chat itself
        .init(); // set as default subscriber

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<Event>();
    let mut client = Client::new(events_tx).with_default_port(args.port);
    let mut input = InputReader::stdin();

    println!("{}", GREETINGS);
    input_reader::prompt(client.name())?;

    loop {
        select! {
            line = input.read() => {
                let Some(line) = line else {
                    debug!("stdin closed");
                    client.disconnect().await;
                    break;
                };

                match client.handle_line(&line).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => input_reader::prompt(client.name())?,
                    Err(e) => input_reader::show_notice(&e.to_string(), client.name())?,
                }
            }
            Some(event) = events_rx.recv() => {
                match event {
                    Event::Packet(packet) => input_reader::show_packet(&packet, client.name())?,
                    Event::Notice(text) => input_reader::show_notice(&text, client.name())?,
                    Event::Disconnected => input_reader::show_notice("Server has disconnected", client.name())?,
                }
            }
        }
    }

    info!("quitting...");
    Ok(())
}
