use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::models::event::ChipEvent;

/// Frames buffered per client before new events are dropped for it.
pub const CLIENT_BUFFER: usize = 256;

/// A realtime client currently subscribed to lifecycle events.
#[derive(Debug)]
pub struct ClientConnection {
    pub id: String,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<String>,
}

impl ClientConnection {
    /// Queues a serialized frame for this client's write loop.
    pub fn send(&self, frame: String) -> bool {
        self.sender.try_send(frame).is_ok()
    }
}

/// Fans lifecycle events out to every connected client.
///
/// Events are not retained: a client only sees what is broadcast while it
/// is registered.
#[derive(Clone, Default)]
pub struct Broadcaster {
    connections: Arc<RwLock<HashMap<String, ClientConnection>>>,
}

impl Broadcaster {
    /// Creates a new `Broadcaster` with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new client and returns its id and frame receiver.
    pub async fn subscribe(&self) -> (String, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        let id = Uuid::new_v4().to_string();

        let connection = ClientConnection {
            id: id.clone(),
            connected_at: Utc::now(),
            sender: tx,
        };

        self.connections.write().await.insert(id.clone(), connection);
        (id, rx)
    }

    /// Removes a client, returning its connection if it was registered.
    pub async fn unsubscribe(&self, client_id: &str) -> Option<ClientConnection> {
        self.connections.write().await.remove(client_id)
    }

    /// Sends `event` to every client registered right now.
    ///
    /// # Returns
    ///
    /// The number of clients the frame was queued for.
    pub async fn broadcast(&self, event: &ChipEvent) -> usize {
        let frame = match sonic_rs::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(event = event.name(), error = %e, "failed to serialize event");
                return 0;
            }
        };

        let conns = self.connections.read().await;
        let mut delivered = 0;
        for conn in conns.values() {
            if conn.send(frame.clone()) {
                delivered += 1;
            } else {
                tracing::warn!(client_id = %conn.id, event = event.name(), "failed to send event to client");
            }
        }

        tracing::debug!(
            event = event.name(),
            chip_id = event.chip_id(),
            recipients = conns.len(),
            delivered,
            "broadcast event"
        );

        delivered
    }

    /// Number of connected clients.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
