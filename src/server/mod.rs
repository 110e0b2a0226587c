//! TCP relay server
//!
//! Binds the listen address, owns the hub and spawns one endpoint per
//! accepted connection. Configuration comes from `APP_PORT` and
//! `BYTE_LIMIT` (see [`ServerConfig::from_env`] and
//! [`HubConfig::from_env`](crate::hub::HubConfig::from_env)).

pub mod config;
pub mod listener;

pub use config::{parse_listen_addr, ServerConfig, APP_PORT_VAR, DEFAULT_PORT};
pub use listener::RelayServer;
