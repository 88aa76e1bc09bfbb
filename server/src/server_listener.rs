use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::client_handler::ClientHandler;
use crate::config::ServerConfig;
use crate::server_types::Shared;

// The admission loop: waits for new connections and hands each one to its own
// handshake task
pub struct ServerListener {
    listener: TcpListener,
    shared: Shared,
    config: Arc<ServerConfig>,
}

impl ServerListener {
    pub fn new(listener: TcpListener, shared: Shared, config: Arc<ServerConfig>) -> Self {
        Self { listener, shared, config }
    }

    pub async fn run(self) {
        info!("Accepting connections on {:?}", self.listener.local_addr().ok());

        loop {
            match self.listener.accept().await {
                Ok((tcp_socket, addr)) => {
                    info!("Server received new client connection {:?}", &addr);

                    let handler = ClientHandler::new(self.shared.clone(), &self.config, addr);
                    ClientHandler::spawn(handler, tcp_socket);
                },
                // e.g. out of file descriptors, the loop keeps going for everyone else
                Err(e) => warn!("Unable to accept connection: {}", e),
            }
        }
    }

    pub fn spawn_accept(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
