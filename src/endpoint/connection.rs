//! Endpoint: one transport connection bridged to the hub

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use crate::hub::{EndpointHandle, EndpointId, HubConfig, HubHandle};
use crate::stats::EndpointStats;

use super::inbound::Inbound;
use super::outbound::Outbound;
use super::state::{EndpointState, InboundExit, OutboundExit};

/// A connected peer
///
/// [`Endpoint::run`] registers with the hub and drives two tasks until the
/// connection ends:
///
/// - inbound (current task): reads chunks, enforces the upload quota and
///   relays them through the hub
/// - outbound (spawned): drains the delivery queue, enforces the download
///   quota and writes to the transport
///
/// They share nothing except the completion signal (inbound → outbound) and
/// the transport-closed signal (outbound → inbound).
pub struct Endpoint<T> {
    id: EndpointId,
    transport: T,
    quota: u64,
    read_buffer_size: usize,
    queue_tx: mpsc::Sender<Bytes>,
    queue_rx: mpsc::Receiver<Bytes>,
}

impl<T> Endpoint<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Create an endpoint over `transport`
    pub fn new(id: EndpointId, transport: T, config: &HubConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.delivery_capacity.max(1));

        Self {
            id,
            transport,
            quota: config.byte_quota,
            read_buffer_size: config.read_buffer_size,
            queue_tx,
            queue_rx,
        }
    }

    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    /// Run the endpoint to completion
    ///
    /// Transport errors end the endpoint but are never returned; the outcome
    /// is reported in the returned stats.
    pub async fn run(self, hub: HubHandle) -> EndpointStats {
        let Endpoint {
            id,
            transport,
            quota,
            read_buffer_size,
            queue_tx,
            queue_rx,
        } = self;

        let mut state = EndpointState::new();
        let (reader, writer) = tokio::io::split(transport);
        let (completion_tx, completion_rx) = oneshot::channel();
        let (closed_tx, mut closed_rx) = oneshot::channel::<()>();

        let registered = hub
            .register(EndpointHandle::new(id.clone(), queue_tx))
            .await;

        let outbound = Outbound::new(id.clone(), writer, queue_rx, quota);
        let outbound_task = tokio::spawn(async move {
            let result = outbound.run(completion_rx).await;
            // Transport is shut down; release a pending read
            drop(closed_tx);
            result
        });

        let mut inbound = Inbound::new(id.clone(), reader, quota, read_buffer_size);
        let inbound_exit = match registered {
            Ok(()) => inbound.run(&hub, &mut closed_rx).await,
            Err(e) => {
                tracing::warn!(endpoint = %id, error = %e, "Could not register endpoint");
                InboundExit::HubClosed
            }
        };
        state.reader_closed();
        tracing::trace!(
            endpoint = %id,
            phase = ?state.phase(),
            inbound = %inbound_exit,
            "Inbound loop stopped"
        );

        let _ = completion_tx.send(inbound_exit);
        if let Err(e) = hub.unregister(id.clone()).await {
            tracing::debug!(endpoint = %id, error = %e, "Could not unregister endpoint");
        }

        let (outbound_exit, downloaded) = match outbound_task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(endpoint = %id, error = %e, "Outbound task failed");
                (OutboundExit::WriteError, 0)
            }
        };
        state.close();

        tracing::debug!(
            endpoint = %id,
            inbound = %inbound_exit,
            outbound = %outbound_exit,
            uploaded = inbound.uploaded(),
            downloaded = downloaded,
            phase = ?state.phase(),
            "Endpoint closed"
        );

        EndpointStats {
            id,
            uploaded_bytes: inbound.uploaded(),
            downloaded_bytes: downloaded,
            inbound_exit,
            outbound_exit,
            duration: state.duration(),
        }
    }
}
