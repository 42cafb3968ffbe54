//! Fan-out of table events to connected clients
//!
//! Every client owns a bounded outbound queue. Broadcasts encode an event
//! once and `try_send` the shared frame onto each queue; a client whose queue
//! is full is evicted instead of slowing the table down. Evictions are
//! collected under the read lock and applied in a single write-lock pass.

use crate::errors::HubError;
use crate::table::events::TableEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{error, info, warn};

/// Encoded event frame shared by all recipients
pub type Frame = Arc<str>;

struct ClientHandle {
    outbound: mpsc::Sender<Frame>,
    close: oneshot::Sender<()>,
}

impl ClientHandle {
    /// Tell the client's writer to shut the connection
    fn close(self) {
        let _ = self.close.send(());
    }
}

/// Receiving half handed to a client's writer task
pub struct ClientConnection {
    pub id: String,
    pub outbound: mpsc::Receiver<Frame>,
    /// Fires when the hub evicts the client
    pub closed: oneshot::Receiver<()>,
}

/// Result of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: usize,
}

pub struct BroadcastHub {
    clients: RwLock<HashMap<String, ClientHandle>>,
    queue_capacity: usize,
}

impl BroadcastHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Add a client under `id`; duplicate identities are refused
    pub async fn register(&self, id: impl Into<String>) -> Result<ClientConnection, HubError> {
        let id = id.into();
        let mut clients = self.clients.write().await;
        if clients.contains_key(&id) {
            return Err(HubError::DuplicateClient(id));
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(self.queue_capacity);
        let (close_tx, close_rx) = oneshot::channel();
        clients.insert(
            id.clone(),
            ClientHandle {
                outbound: outbound_tx,
                close: close_tx,
            },
        );
        info!("👤 Client {} registered ({} connected)", id, clients.len());

        Ok(ClientConnection {
            id,
            outbound: outbound_rx,
            closed: close_rx,
        })
    }

    /// Drop a client after its connection ended; returns whether it was known
    pub async fn unregister(&self, id: &str) -> bool {
        let removed = self.clients.write().await.remove(id);
        match removed {
            Some(handle) => {
                handle.close();
                info!("👋 Client {} unregistered", id);
                true
            }
            None => false,
        }
    }

    /// Queue `event` for every client without waiting on any of them
    pub async fn broadcast(&self, event: &TableEvent) -> BroadcastReport {
        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode event: {}", e);
                return BroadcastReport::default();
            }
        };

        let mut report = BroadcastReport::default();
        let mut dead = Vec::new();
        {
            let clients = self.clients.read().await;
            for (id, handle) in clients.iter() {
                match handle.outbound.try_send(frame.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(_) => dead.push(id.clone()),
                }
            }
        }

        report.evicted = self.evict(&dead).await;
        report
    }

    /// Queue `event` for one client only
    pub async fn send_to(&self, id: &str, event: &TableEvent) -> Result<(), HubError> {
        let frame = event.encode().map_err(|e| {
            error!("Failed to encode event: {}", e);
            HubError::UnknownClient(id.to_string())
        })?;

        let outcome = {
            let clients = self.clients.read().await;
            match clients.get(id) {
                Some(handle) => handle.outbound.try_send(frame),
                None => return Err(HubError::UnknownClient(id.to_string())),
            }
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.evict(&[id.to_string()]).await;
                Err(HubError::SlowConsumer(id.to_string()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.evict(&[id.to_string()]).await;
                Err(HubError::UnknownClient(id.to_string()))
            }
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_connected(&self, id: &str) -> bool {
        self.clients.read().await.contains_key(id)
    }

    async fn evict(&self, ids: &[String]) -> usize {
        if ids.is_empty() {
            return 0;
        }

        let mut clients = self.clients.write().await;
        let mut evicted = 0;
        for id in ids {
            if let Some(handle) = clients.remove(id) {
                warn!("🐢 Evicting client {}: {}", id, HubError::SlowConsumer(id.clone()));
                handle.close();
                evicted += 1;
            }
        }
        evicted
    }
}
