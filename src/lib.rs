//! byte-relay: a TCP broadcast hub with per-connection byte quotas
//!
//! Every chunk read from one client is relayed, unchanged and in order, to
//! every other connected client. Each connection may upload and download a
//! limited number of bytes; the direction that reaches its quota gets a
//! one-line notice and the connection is closed.
//!
//! # Example
//!
//! ```no_run
//! use byte_relay::{HubConfig, RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> byte_relay::Result<()> {
//!     let server = RelayServer::new(ServerConfig::default(), HubConfig::with_quota(4096));
//!     server.run().await
//! }
//! ```
//!
//! The hub can also be driven directly over any `AsyncRead + AsyncWrite`
//! transport:
//!
//! ```no_run
//! use byte_relay::{Endpoint, Hub, HubConfig};
//!
//! # async fn demo() {
//! let (hub, _task) = Hub::spawn(HubConfig::default());
//! let (server_side, _client_side) = tokio::io::duplex(1024);
//! let endpoint = Endpoint::new("local".into(), server_side, hub.config());
//! let stats = endpoint.run(hub).await;
//! println!("uploaded {} bytes", stats.uploaded_bytes);
//! # }
//! ```

pub mod endpoint;
pub mod error;
pub mod hub;
pub mod server;
pub mod stats;

pub use endpoint::{Endpoint, InboundExit, OutboundExit};
pub use error::{ConfigError, Error, Result};
pub use hub::{EndpointId, Hub, HubConfig, HubError, HubHandle, OverflowPolicy, RelayMessage};
pub use server::{RelayServer, ServerConfig};
pub use stats::{EndpointStats, HubStats};
