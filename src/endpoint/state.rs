//! Endpoint state machine and exit reasons

use std::time::{Duration, Instant};

/// Written to the transport when the upload quota is reached
pub const UPLOAD_LIMIT_NOTICE: &[u8] = b"Upload limit reached. Disconnecting...\n";

/// Written to the transport when the download quota is reached
pub const DOWNLOAD_LIMIT_NOTICE: &[u8] = b"Download limit reached. Disconnecting...\n";

/// Endpoint lifecycle phase
///
/// ```text
/// Active ──(inbound loop exits)──► ReaderClosed ──(outbound loop exits)──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointPhase {
    /// Both loops running
    Active,
    /// Inbound loop stopped, outbound loop still draining
    ReaderClosed,
    /// Both loops stopped, transport shut down
    Closed,
}

/// Why the inbound loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundExit {
    /// Peer closed its side (end of stream)
    PeerClosed,
    /// Reading from the transport failed
    ReadError,
    /// Cumulative upload reached the quota
    UploadLimit,
    /// The outbound loop shut the transport down
    TransportClosed,
    /// The hub stopped accepting requests
    HubClosed,
}

impl std::fmt::Display for InboundExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InboundExit::PeerClosed => "peer closed",
            InboundExit::ReadError => "read error",
            InboundExit::UploadLimit => "upload limit reached",
            InboundExit::TransportClosed => "transport closed",
            InboundExit::HubClosed => "hub closed",
        };
        f.write_str(s)
    }
}

/// Why the outbound loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundExit {
    /// The inbound loop signalled completion
    Completed,
    /// The hub closed the delivery queue
    QueueClosed,
    /// Cumulative download reached the quota
    DownloadLimit,
    /// Writing to the transport failed
    WriteError,
}

impl std::fmt::Display for OutboundExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutboundExit::Completed => "completed",
            OutboundExit::QueueClosed => "queue closed",
            OutboundExit::DownloadLimit => "download limit reached",
            OutboundExit::WriteError => "write error",
        };
        f.write_str(s)
    }
}

/// Tracks an endpoint's phase
///
/// Transitions only move forward; out-of-order calls are ignored.
#[derive(Debug)]
pub struct EndpointState {
    phase: EndpointPhase,
    started_at: Instant,
}

impl EndpointState {
    pub fn new() -> Self {
        Self {
            phase: EndpointPhase::Active,
            started_at: Instant::now(),
        }
    }

    pub fn phase(&self) -> EndpointPhase {
        self.phase
    }

    /// Inbound loop has stopped
    pub fn reader_closed(&mut self) {
        if self.phase == EndpointPhase::Active {
            self.phase = EndpointPhase::ReaderClosed;
        }
    }

    /// Both loops have stopped
    pub fn close(&mut self) {
        if self.phase == EndpointPhase::ReaderClosed {
            self.phase = EndpointPhase::Closed;
        }
    }

    /// Time since the endpoint was created
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for EndpointState {
    fn default() -> Self {
        Self::new()
    }
}
