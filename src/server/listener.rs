//! Relay server listener
//!
//! Handles the TCP accept loop and spawns one endpoint per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::hub::{EndpointId, Hub, HubConfig, HubHandle};
use crate::server::config::ServerConfig;

/// Relay server
pub struct RelayServer {
    config: ServerConfig,
    hub_config: HubConfig,
    next_endpoint_seq: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl RelayServer {
    /// Create a new server
    pub fn new(config: ServerConfig, hub_config: HubConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            hub_config,
            next_endpoint_seq: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Create a server configured from `APP_PORT` and `BYTE_LIMIT`
    pub fn from_env() -> Self {
        Self::new(ServerConfig::from_env(), HubConfig::from_env())
    }

    /// Run the server
    ///
    /// This method only returns if binding the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` resolves
    ///
    /// Shutdown stops accepting new connections. Endpoints already running
    /// are left to finish on their own.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        // Host names in the bind address are resolved here
        let listener = TcpListener::bind(self.config.bind_addr.as_str()).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Accept connections from an already bound listener until `shutdown`
    /// resolves
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            byte_quota = self.hub_config.byte_quota,
            "Relay server listening"
        );

        // The hub keeps running while any endpoint still holds a handle
        let (hub, _hub_task) = Hub::spawn(self.hub_config.clone());

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.accept_loop(&listener, &hub) => {}
        }

        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener, hub: &HubHandle) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr, hub);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr, hub: &HubHandle) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let seq = self.next_endpoint_seq.fetch_add(1, Ordering::Relaxed);
        let id = EndpointId::from_peer(peer_addr, seq);

        tracing::debug!(endpoint = %id, peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let hub = hub.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let endpoint = Endpoint::new(id, socket, hub.config());
            let stats = endpoint.run(hub).await;

            tracing::debug!(
                endpoint = %stats.id,
                duration_ms = stats.duration.as_millis() as u64,
                "Connection closed"
            );
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    /// Get the hub configuration
    pub fn hub_config(&self) -> &HubConfig {
        &self.hub_config
    }
}
