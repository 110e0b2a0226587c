//! Hub control loop
//!
//! The registry lives inside one task and is never shared. Endpoints talk to
//! it through a [`HubHandle`], whose methods enqueue requests on the loop's
//! channels.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::stats::HubStats;

use super::config::{HubConfig, OverflowPolicy};
use super::error::HubError;
use super::event::{EndpointHandle, EndpointId, LifecycleEvent, RelayMessage};

/// Read-only requests answered from inside the control loop
#[derive(Debug)]
enum HubQuery {
    Stats(oneshot::Sender<HubStats>),
}

/// The broadcast hub
///
/// Created together with its first [`HubHandle`]. Call [`Hub::run`] (or use
/// [`Hub::spawn`]) to start processing requests. The loop ends once every
/// handle has been dropped.
pub struct Hub {
    events: mpsc::Receiver<LifecycleEvent>,
    messages: mpsc::Receiver<RelayMessage>,
    queries: mpsc::Receiver<HubQuery>,
    registry: Registry,
}

impl Hub {
    /// Create a hub and a handle to it
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let capacity = config.control_capacity.max(1);
        let (events_tx, events) = mpsc::channel(capacity);
        let (messages_tx, messages) = mpsc::channel(capacity);
        let (queries_tx, queries) = mpsc::channel(capacity);

        let config = Arc::new(config);
        let handle = HubHandle {
            events: events_tx,
            messages: messages_tx,
            queries: queries_tx,
            config: Arc::clone(&config),
        };

        let hub = Self {
            events,
            messages,
            queries,
            registry: Registry::new(config),
        };

        (hub, handle)
    }

    /// Create a hub and run it on a new task
    ///
    /// The task resolves to the final statistics after the last handle is
    /// dropped.
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<HubStats>) {
        let (hub, handle) = Self::new(config);
        (handle, tokio::spawn(hub.run()))
    }

    /// Run the control loop until all handles are gone
    pub async fn run(self) -> HubStats {
        let Hub {
            mut events,
            mut messages,
            mut queries,
            mut registry,
        } = self;

        tracing::debug!(
            byte_quota = registry.config.byte_quota,
            policy = ?registry.config.overflow_policy,
            "Hub control loop started"
        );

        // Lifecycle events are polled first so that a register or unregister
        // enqueued before a message or query is always applied before it.
        loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => registry.apply(event),
                Some(message) = messages.recv() => registry.broadcast(message).await,
                Some(query) = queries.recv() => registry.answer(query),
                else => break,
            }
        }

        let stats = registry.snapshot();
        tracing::debug!(
            relayed = stats.messages_relayed,
            deliveries = stats.deliveries,
            "Hub control loop stopped"
        );
        stats
    }
}

/// State owned by the control loop
struct Registry {
    config: Arc<HubConfig>,
    endpoints: HashMap<EndpointId, EndpointHandle>,
    stats: HubStats,
}

impl Registry {
    fn new(config: Arc<HubConfig>) -> Self {
        Self {
            config,
            endpoints: HashMap::new(),
            stats: HubStats::default(),
        }
    }

    fn apply(&mut self, event: LifecycleEvent) {
        tracing::trace!(
            endpoint = %event.endpoint_id(),
            kind = ?event.kind(),
            "Lifecycle event"
        );

        match event {
            LifecycleEvent::Register(handle) => {
                let id = handle.id().clone();
                if self.endpoints.insert(id.clone(), handle).is_some() {
                    tracing::warn!(endpoint = %id, "Endpoint id reused, previous entry replaced");
                }
                self.stats.total_registrations += 1;

                tracing::info!(
                    endpoint = %id,
                    connections = self.endpoints.len(),
                    "Endpoint registered"
                );
            }
            LifecycleEvent::Unregister(id) => {
                // Dropping the handle closes the endpoint's delivery queue.
                if self.endpoints.remove(&id).is_some() {
                    self.stats.total_unregistrations += 1;

                    tracing::info!(
                        endpoint = %id,
                        connections = self.endpoints.len(),
                        "Endpoint unregistered"
                    );
                }
            }
        }
    }

    async fn broadcast(&mut self, message: RelayMessage) {
        let RelayMessage { origin, payload } = message;
        let mut evicted = Vec::new();

        self.stats.messages_relayed += 1;
        self.stats.bytes_relayed += payload.len() as u64;

        for (id, endpoint) in &self.endpoints {
            if *id == origin {
                continue;
            }

            match self.config.overflow_policy {
                OverflowPolicy::Block => {
                    if endpoint.queue().send(payload.clone()).await.is_err() {
                        tracing::debug!(endpoint = %id, "Delivery queue has no reader, skipping");
                        continue;
                    }
                }
                OverflowPolicy::Disconnect => match endpoint.queue().try_send(payload.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        evicted.push(id.clone());
                        continue;
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(endpoint = %id, "Delivery queue has no reader, skipping");
                        continue;
                    }
                },
            }

            self.stats.deliveries += 1;
        }

        for id in evicted {
            if self.endpoints.remove(&id).is_some() {
                self.stats.evictions += 1;
                tracing::warn!(
                    endpoint = %id,
                    origin = %origin,
                    "Delivery queue full, endpoint evicted"
                );
            }
        }
    }

    fn answer(&self, query: HubQuery) {
        match query {
            HubQuery::Stats(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> HubStats {
        HubStats {
            connections: self.endpoints.len(),
            ..self.stats.clone()
        }
    }
}

/// Cloneable handle for sending requests to the hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<LifecycleEvent>,
    messages: mpsc::Sender<RelayMessage>,
    queries: mpsc::Sender<HubQuery>,
    config: Arc<HubConfig>,
}

impl HubHandle {
    /// Configuration the hub was created with
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Add an endpoint to the registry
    pub async fn register(&self, endpoint: EndpointHandle) -> Result<(), HubError> {
        self.send_event(LifecycleEvent::Register(endpoint)).await
    }

    /// Remove an endpoint from the registry, closing its delivery queue
    ///
    /// Unknown or already removed identifiers are ignored.
    pub async fn unregister(&self, id: EndpointId) -> Result<(), HubError> {
        self.send_event(LifecycleEvent::Unregister(id)).await
    }

    /// Send a lifecycle event
    pub async fn send_event(&self, event: LifecycleEvent) -> Result<(), HubError> {
        self.events.send(event).await.map_err(|_| HubError::Closed)
    }

    /// Relay a payload to every registered endpoint except its origin
    ///
    /// Waits while the hub's relay channel is full.
    pub async fn broadcast(&self, message: RelayMessage) -> Result<(), HubError> {
        self.messages.send(message).await.map_err(|_| HubError::Closed)
    }

    /// Current hub statistics
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (tx, rx) = oneshot::channel();
        self.queries
            .send(HubQuery::Stats(tx))
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Number of currently registered endpoints
    pub async fn connection_count(&self) -> Result<usize, HubError> {
        Ok(self.stats().await?.connections)
    }
}
