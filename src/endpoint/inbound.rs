//! Inbound loop: transport → hub

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::oneshot;

use crate::hub::{EndpointId, HubHandle, RelayMessage};

use super::state::InboundExit;

/// Reads chunks from the transport and forwards them to the hub
///
/// Owns the upload counter; nothing else writes it.
pub(crate) struct Inbound<R> {
    id: EndpointId,
    reader: R,
    buffer: Vec<u8>,
    uploaded: u64,
    quota: u64,
}

impl<R: AsyncRead + Unpin> Inbound<R> {
    pub(crate) fn new(id: EndpointId, reader: R, quota: u64, buffer_size: usize) -> Self {
        Self {
            id,
            reader,
            buffer: vec![0; buffer_size.max(1)],
            uploaded: 0,
            quota,
        }
    }

    pub(crate) fn uploaded(&self) -> u64 {
        self.uploaded
    }

    /// Run until the peer goes away, a read fails, the quota is reached or
    /// `transport_closed` fires
    ///
    /// A chunk that takes the counter to the quota is not relayed.
    pub(crate) async fn run(
        &mut self,
        hub: &HubHandle,
        transport_closed: &mut oneshot::Receiver<()>,
    ) -> InboundExit {
        loop {
            let read = tokio::select! {
                read = self.reader.read(&mut self.buffer) => read,
                _ = &mut *transport_closed => {
                    tracing::debug!(endpoint = %self.id, "Transport closed while reading");
                    return InboundExit::TransportClosed;
                }
            };

            let n = match read {
                Ok(0) => {
                    tracing::debug!(endpoint = %self.id, "Peer closed connection");
                    return InboundExit::PeerClosed;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(endpoint = %self.id, error = %e, "Read error");
                    return InboundExit::ReadError;
                }
            };

            self.uploaded += n as u64;
            if self.uploaded >= self.quota {
                tracing::info!(
                    endpoint = %self.id,
                    uploaded = self.uploaded,
                    quota = self.quota,
                    "Upload limit reached"
                );
                return InboundExit::UploadLimit;
            }

            let payload = Bytes::copy_from_slice(&self.buffer[..n]);
            if hub
                .broadcast(RelayMessage::new(self.id.clone(), payload))
                .await
                .is_err()
            {
                return InboundExit::HubClosed;
            }
        }
    }
}
