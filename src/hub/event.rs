//! Values exchanged between endpoints and the hub
//!
//! Everything here is cheap to clone and never stored beyond the hub's
//! registry: identifiers are `Arc<str>` and payloads are `Bytes`.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Unique identifier for a connected endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(Arc<str>);

impl EndpointId {
    /// Create an identifier from any string
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Identifier for an accepted connection: peer address plus a sequence
    /// number that is never reused within the process
    pub fn from_peer(peer_addr: SocketAddr, seq: u64) -> Self {
        Self::new(format!("{}-{}", peer_addr, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EndpointId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// A chunk read from one endpoint, to be relayed to all the others
#[derive(Debug, Clone)]
pub struct RelayMessage {
    /// Endpoint the bytes were read from
    pub origin: EndpointId,
    /// Raw bytes exactly as read (zero-copy fan-out via reference counting)
    pub payload: Bytes,
}

impl RelayMessage {
    pub fn new(origin: EndpointId, payload: impl Into<Bytes>) -> Self {
        Self {
            origin,
            payload: payload.into(),
        }
    }
}

/// Hub-side reference to an endpoint
///
/// Holds the only sending half of the endpoint's delivery queue. Dropping the
/// handle closes the queue, so whoever owns the handle is the queue's single
/// closer. Not `Clone`.
#[derive(Debug)]
pub struct EndpointHandle {
    id: EndpointId,
    queue: mpsc::Sender<Bytes>,
}

impl EndpointHandle {
    pub fn new(id: EndpointId, queue: mpsc::Sender<Bytes>) -> Self {
        Self { id, queue }
    }

    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    pub(super) fn queue(&self) -> &mpsc::Sender<Bytes> {
        &self.queue
    }
}

/// Kind of lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Register,
    Unregister,
}

/// Registration change sent from an endpoint to the hub
#[derive(Debug)]
pub enum LifecycleEvent {
    /// Add the endpoint to the registry, replacing any entry with the same id
    Register(EndpointHandle),
    /// Remove the endpoint and close its delivery queue (no-op if absent)
    Unregister(EndpointId),
}

impl LifecycleEvent {
    pub fn kind(&self) -> LifecycleKind {
        match self {
            LifecycleEvent::Register(_) => LifecycleKind::Register,
            LifecycleEvent::Unregister(_) => LifecycleKind::Unregister,
        }
    }

    /// Identifier of the endpoint the event refers to
    pub fn endpoint_id(&self) -> &EndpointId {
        match self {
            LifecycleEvent::Register(handle) => handle.id(),
            LifecycleEvent::Unregister(id) => id,
        }
    }
}
