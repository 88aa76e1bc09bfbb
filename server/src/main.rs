use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::fmt;

use irc_protocol::SERVER_PORT;
use irc_server::{Server, ServerConfig, ServerResult};

/// irc-server - relays text messages between users grouped in channels
#[derive(Debug, Parser)]
#[command(name = "irc-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, short, default_value_t = SERVER_PORT)]
    port: u16,

    /// Maximum number of connected users
    #[arg(long)]
    max_users: Option<usize>,

    /// Maximum number of live channels
    #[arg(long)]
    max_channels: Option<usize>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    let args = Args::parse();

    fmt()
        .compact() // use abbreviated log format
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_thread_ids(true) // display thread id where event happens
        .init(); // set as default subscriber

    let mut config = ServerConfig::new(SocketAddr::new(args.host, args.port));
    if let Some(n) = args.max_users {
        config = config.with_max_users(n);
    }
    if let Some(n) = args.max_channels {
        config = config.with_max_channels(n);
    }

    info!("Server starting.. {:?}", &config.addr);

    let server = Server::bind(config).await?;
    server.run().await;

    Ok(())
}
