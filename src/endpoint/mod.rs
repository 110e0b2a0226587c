//! Per-connection endpoint
//!
//! An endpoint bridges one transport connection to the hub with two loops:
//!
//! ```text
//!             ┌──────────── Endpoint ─────────────┐
//!  socket ──► │ inbound:  read ─► quota ─► relay  │ ──► Hub
//!             │              │ completion          │
//!             │              ▼                     │
//!  socket ◄── │ outbound: write ◄─ quota ◄─ queue  │ ◄── Hub
//!             └────────────────────────────────────┘
//! ```
//!
//! Both directions stop for good once their byte counter reaches the quota.
//! The chunk or payload that crosses the limit is replaced by a one-line
//! notice rather than delivered.

pub mod connection;
mod inbound;
mod outbound;
pub mod state;

pub use connection::Endpoint;
pub use state::{
    EndpointPhase, EndpointState, InboundExit, OutboundExit, DOWNLOAD_LIMIT_NOTICE,
    UPLOAD_LIMIT_NOTICE,
};
