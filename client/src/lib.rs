pub mod types;

// io
pub mod input_reader;

// server session
mod builder;
pub mod client_reader;
pub mod session;

// client
pub mod client;

pub use client::{Client, Flow};
pub use types::{ClientError, Event};
