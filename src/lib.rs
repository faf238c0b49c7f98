// Public API for integration tests and potential library usage

pub mod api;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod ws;
