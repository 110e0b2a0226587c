//! Outbound loop: delivery queue → transport

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use crate::hub::EndpointId;

use super::state::{InboundExit, OutboundExit, DOWNLOAD_LIMIT_NOTICE, UPLOAD_LIMIT_NOTICE};

/// Drains the delivery queue into the transport
///
/// Sole writer of the transport and of the download counter. The transport
/// is shut down exactly once, when [`Outbound::run`] finishes.
pub(crate) struct Outbound<W> {
    id: EndpointId,
    writer: W,
    queue: mpsc::Receiver<Bytes>,
    downloaded: u64,
    quota: u64,
}

impl<W: AsyncWrite + Unpin> Outbound<W> {
    pub(crate) fn new(id: EndpointId, writer: W, queue: mpsc::Receiver<Bytes>, quota: u64) -> Self {
        Self {
            id,
            writer,
            queue,
            downloaded: 0,
            quota,
        }
    }

    /// Run until completion, queue close, quota or write failure, then shut
    /// the transport down
    ///
    /// Returns the exit reason and the final download counter.
    pub(crate) async fn run(
        mut self,
        completion: oneshot::Receiver<InboundExit>,
    ) -> (OutboundExit, u64) {
        let exit = self.pump(completion).await;

        if let Err(e) = self.writer.shutdown().await {
            tracing::trace!(endpoint = %self.id, error = %e, "Transport shutdown failed");
        }

        (exit, self.downloaded)
    }

    async fn pump(&mut self, mut completion: oneshot::Receiver<InboundExit>) -> OutboundExit {
        loop {
            // Completion is checked first: the hub closes the queue only after
            // the inbound loop has signalled, and an upload notice must not be
            // lost to that race.
            tokio::select! {
                biased;
                inbound = &mut completion => {
                    if matches!(inbound, Ok(InboundExit::UploadLimit)) {
                        if let Err(e) = self.write(UPLOAD_LIMIT_NOTICE).await {
                            tracing::debug!(endpoint = %self.id, error = %e, "Failed to write upload notice");
                            return OutboundExit::WriteError;
                        }
                    }
                    return OutboundExit::Completed;
                }
                payload = self.queue.recv() => {
                    let Some(payload) = payload else {
                        return OutboundExit::QueueClosed;
                    };

                    self.downloaded += payload.len() as u64;
                    if self.downloaded >= self.quota {
                        tracing::info!(
                            endpoint = %self.id,
                            downloaded = self.downloaded,
                            quota = self.quota,
                            "Download limit reached"
                        );
                        if let Err(e) = self.write(DOWNLOAD_LIMIT_NOTICE).await {
                            tracing::debug!(endpoint = %self.id, error = %e, "Failed to write download notice");
                        }
                        return OutboundExit::DownloadLimit;
                    }

                    if let Err(e) = self.write(&payload).await {
                        tracing::debug!(endpoint = %self.id, error = %e, "Write error");
                        return OutboundExit::WriteError;
                    }
                }
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio::time::timeout;

    use super::*;

    fn outbound(writer: DuplexStream, quota: u64) -> (Outbound<DuplexStream>, mpsc::Sender<Bytes>) {
        let (tx, rx) = mpsc::channel(10);
        (Outbound::new("test-session".into(), writer, rx, quota), tx)
    }

    async fn read_all(client: &mut DuplexStream) -> Vec<u8> {
        let mut received = Vec::new();
        timeout(Duration::from_millis(200), client.read_to_end(&mut received))
            .await
            .expect("transport was not shut down")
            .unwrap();
        received
    }

    #[tokio::test]
    async fn test_writes_payload_until_completion() {
        let (server, mut client) = tokio::io::duplex(1024);
        let (outbound, queue) = outbound(server, 1000);
        let (done_tx, done_rx) = oneshot::channel();

        queue.send(Bytes::from_static(b"Im alive!")).await.unwrap();
        let task = tokio::spawn(outbound.run(done_rx));

        let mut buf = [0u8; 100];
        let n = timeout(Duration::from_millis(200), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"Im alive!");

        done_tx.send(InboundExit::PeerClosed).unwrap();
        let (exit, downloaded) = timeout(Duration::from_millis(200), task)
            .await
            .expect("outbound loop did not exit")
            .unwrap();
        assert_eq!(exit, OutboundExit::Completed);
        assert_eq!(downloaded, 9);

        // Nothing beyond the payload, then end of stream
        assert!(read_all(&mut client).await.is_empty());
    }

    #[tokio::test]
    async fn test_write_error_exits() {
        let writer = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();
        let (tx, rx) = mpsc::channel(10);
        let (_done_tx, done_rx) = oneshot::channel();

        tx.send(Bytes::from_static(b"test")).await.unwrap();
        let outbound = Outbound::new("test-session".into(), writer, rx, 1000);

        let (exit, _) = timeout(Duration::from_millis(200), outbound.run(done_rx))
            .await
            .expect("outbound loop did not exit");
        assert_eq!(exit, OutboundExit::WriteError);
    }

    #[tokio::test]
    async fn test_download_limit() {
        let (server, mut client) = tokio::io::duplex(1024);
        let (outbound, queue) = outbound(server, 10);
        let (_done_tx, done_rx) = oneshot::channel();

        queue
            .send(Bytes::from_static(b"This message is longer than 10 bytes"))
            .await
            .unwrap();
        let (exit, _) = outbound.run(done_rx).await;

        assert_eq!(exit, OutboundExit::DownloadLimit);
        assert_eq!(read_all(&mut client).await, DOWNLOAD_LIMIT_NOTICE);
    }

    #[tokio::test]
    async fn test_download_limit_exact_boundary() {
        let (server, mut client) = tokio::io::duplex(1024);
        let (mut outbound, queue) = outbound(server, 10);
        let (_done_tx, done_rx) = oneshot::channel();
        outbound.downloaded = 5;

        queue.send(Bytes::from_static(b"5byte")).await.unwrap();
        let (exit, downloaded) = outbound.run(done_rx).await;

        assert_eq!(exit, OutboundExit::DownloadLimit);
        assert_eq!(downloaded, 10);
        assert_eq!(read_all(&mut client).await, DOWNLOAD_LIMIT_NOTICE);
    }

    #[tokio::test]
    async fn test_nothing_written_after_download_limit() {
        let (server, mut client) = tokio::io::duplex(1024);
        let (outbound, queue) = outbound(server, 10);
        let (_done_tx, done_rx) = oneshot::channel();

        for chunk in ["abc", "defghijk", "lmnop"] {
            queue.send(Bytes::from_static(chunk.as_bytes())).await.unwrap();
        }
        let (exit, _) = outbound.run(done_rx).await;
        assert_eq!(exit, OutboundExit::DownloadLimit);

        let mut expected = b"abc".to_vec();
        expected.extend_from_slice(DOWNLOAD_LIMIT_NOTICE);
        assert_eq!(read_all(&mut client).await, expected);
    }

    #[tokio::test]
    async fn test_queue_closed_exits() {
        let (server, mut client) = tokio::io::duplex(1024);
        let (outbound, queue) = outbound(server, 1000);
        let (_done_tx, done_rx) = oneshot::channel();

        drop(queue);
        let (exit, _) = timeout(Duration::from_millis(200), outbound.run(done_rx))
            .await
            .expect("outbound loop did not exit");

        assert_eq!(exit, OutboundExit::QueueClosed);
        assert!(read_all(&mut client).await.is_empty());
    }

    #[tokio::test]
    async fn test_completion_already_signalled() {
        let (server, mut client) = tokio::io::duplex(1024);
        let (outbound, _queue) = outbound(server, 1000);
        let (done_tx, done_rx) = oneshot::channel();

        done_tx.send(InboundExit::ReadError).unwrap();
        let (exit, _) = timeout(Duration::from_millis(200), outbound.run(done_rx))
            .await
            .expect("outbound loop did not exit");

        assert_eq!(exit, OutboundExit::Completed);
        assert!(read_all(&mut client).await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_limit_writes_notice() {
        let (server, mut client) = tokio::io::duplex(1024);
        let (outbound, queue) = outbound(server, 1000);
        let (done_tx, done_rx) = oneshot::channel();

        done_tx.send(InboundExit::UploadLimit).unwrap();
        // Queue already closed as well: the notice still goes out
        drop(queue);
        let (exit, _) = outbound.run(done_rx).await;

        assert_eq!(exit, OutboundExit::Completed);
        assert_eq!(read_all(&mut client).await, UPLOAD_LIMIT_NOTICE);
    }
}
