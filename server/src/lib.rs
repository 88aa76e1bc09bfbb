pub mod client_handler;
pub mod client_reader;
pub mod config;
pub mod delivery;
pub mod error;
pub mod names;
pub mod registry;
pub mod request_handler;
pub mod server;
pub mod server_channel;
pub mod server_listener;
pub mod server_types;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::Server;
