use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::registry::Registry;
use crate::server_listener::ServerListener;
use crate::server_types::Shared;

// Chat server: a bound listener plus the shared registry every task works on
pub struct Server {
    listener: TcpListener,
    shared: Shared,
    config: Arc<ServerConfig>,
}

impl Server {
    // Bind failures abort startup
    pub async fn bind(config: ServerConfig) -> ServerResult<Server> {
        let listener = TcpListener::bind(config.addr)
            .await
            .map_err(|source| ServerError::Bind { addr: config.addr, source })?;

        let shared: Shared = Arc::new(Mutex::new(Registry::from_config(&config)));
        info!(
            "Server bound to {} (max users {}, max channels {})",
            config.addr, config.max_users, config.max_channels
        );

        Ok(Server { listener, shared, config: Arc::new(config) })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Shared {
        self.shared.clone()
    }

    // Runs until the process is stopped
    pub async fn run(self) {
        ServerListener::new(self.listener, self.shared, self.config).run().await
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        ServerListener::new(self.listener, self.shared, self.config).spawn_accept()
    }
}
