//! Statistics for the hub and its endpoints

use std::time::Duration;

use crate::endpoint::{InboundExit, OutboundExit};
use crate::hub::EndpointId;

/// Hub-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Currently registered endpoints
    pub connections: usize,
    /// Register events applied
    pub total_registrations: u64,
    /// Unregister events that removed an endpoint
    pub total_unregistrations: u64,
    /// Relay messages processed
    pub messages_relayed: u64,
    /// Payload bytes of all relay messages processed
    pub bytes_relayed: u64,
    /// Individual payload pushes onto delivery queues
    pub deliveries: u64,
    /// Endpoints removed because their delivery queue was full
    pub evictions: u64,
}

/// Summary of one endpoint's lifetime, produced when it finishes
#[derive(Debug, Clone)]
pub struct EndpointStats {
    /// Endpoint identifier
    pub id: EndpointId,
    /// Bytes read from the transport (including a chunk that hit the quota)
    pub uploaded_bytes: u64,
    /// Bytes taken from the delivery queue (including a payload that hit the quota)
    pub downloaded_bytes: u64,
    /// Why the inbound loop stopped
    pub inbound_exit: InboundExit,
    /// Why the outbound loop stopped
    pub outbound_exit: OutboundExit,
    /// Time from start to teardown
    pub duration: Duration,
}

impl EndpointStats {
    /// Whether either direction was cut off by the byte quota
    pub fn hit_quota(&self) -> bool {
        self.inbound_exit == InboundExit::UploadLimit
            || self.outbound_exit == OutboundExit::DownloadLimit
    }
}
