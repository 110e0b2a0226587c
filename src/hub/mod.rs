//! Broadcast hub
//!
//! The hub owns the registry of connected endpoints and relays every chunk
//! read from one endpoint to all the others. It runs as a single task that
//! consumes requests from bounded channels, so the registry has exactly one
//! writer and needs no lock.
//!
//! # Architecture
//!
//! ```text
//!                          Hub control loop (one task)
//!                     ┌───────────────────────────────┐
//!   events  ─────────►│ endpoints: HashMap<Id,        │
//!   messages ────────►│   EndpointHandle {            │
//!   queries ─────────►│     queue: mpsc::Sender,      │
//!                     │   }                           │
//!                     │ >                             │
//!                     └───────────────┬───────────────┘
//!                                     │ push payload
//!         ┌───────────────────────────┼──────────────────────────┐
//!         ▼                           ▼                          ▼
//!   [Endpoint A]                [Endpoint B]               [Endpoint C]
//!   outbound loop               outbound loop              outbound loop
//!   queue.recv() ──► TCP        queue.recv() ──► TCP       queue.recv() ──► TCP
//! ```
//!
//! # Queue ownership
//!
//! The registry holds the only `Sender` of each delivery queue. Removing an
//! endpoint drops it, which closes the queue exactly once; an endpoint can
//! never close its own queue.

pub mod config;
pub mod control;
pub mod error;
pub mod event;

pub use config::{HubConfig, OverflowPolicy};
pub use control::{Hub, HubHandle};
pub use error::HubError;
pub use event::{EndpointHandle, EndpointId, LifecycleEvent, LifecycleKind, RelayMessage};
