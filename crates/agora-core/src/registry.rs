//! Live WebSocket connection registry.
//!
//! Tracks every connected client as an unbounded channel of outbound JSON
//! frames; the WebSocket task owns the receiving half and the socket
//! itself. Sends are lock-free pushes, so a slow peer can never stall a
//! broadcast, and a failed push (receiver dropped) marks the connection
//! dead and removes it.
//!
//! `broadcast` iterates over a snapshot of the live set: removals triggered
//! mid-sweep (concurrent disconnects, failed sends) cannot corrupt
//! iteration or skip healthy recipients.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use agora_types::protocol::ServerFrame;

/// Opaque handle for a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry of live connections, mutated on register/remove and on send
/// failure. Shared across the WebSocket handlers, the intake pipeline, and
/// the autonomous scheduler.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection's outbound sender to the live set.
    pub fn register(&self, sender: mpsc::UnboundedSender<String>) -> ConnectionId {
        let id = ConnectionId(Uuid::now_v7());
        self.connections.insert(id, sender);
        tracing::info!(connection = %id, live = self.len(), "websocket connection registered");
        id
    }

    /// Remove a connection. Removing an already-removed handle is a no-op.
    pub fn remove(&self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            tracing::info!(connection = %id, live = self.len(), "websocket connection removed");
        }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send a frame to one connection. On any failure the connection is
    /// treated as dead, removed, and `false` is returned. Never panics.
    pub fn unicast(&self, id: ConnectionId, frame: &ServerFrame) -> bool {
        let Some(sender) = self.connections.get(&id).map(|s| s.clone()) else {
            tracing::debug!(connection = %id, "unicast to unknown connection skipped");
            return false;
        };
        if sender.send(frame.to_json()).is_err() {
            tracing::debug!(connection = %id, "unicast failed, dropping connection");
            self.remove(id);
            return false;
        }
        true
    }

    /// Send a frame to every live connection except `exclude`.
    ///
    /// Failed recipients are accumulated during the sweep and removed only
    /// after it completes, so one stale socket never aborts delivery to the
    /// rest of the audience.
    pub fn broadcast(&self, frame: &ServerFrame, exclude: Option<ConnectionId>) {
        let payload = frame.to_json();
        let snapshot: Vec<(ConnectionId, mpsc::UnboundedSender<String>)> = self
            .connections
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut dead = Vec::new();
        for (id, sender) in snapshot {
            if exclude == Some(id) {
                continue;
            }
            if sender.send(payload.clone()).is_err() {
                dead.push(id);
            }
        }

        for id in dead {
            tracing::debug!(connection = %id, "broadcast send failed, dropping connection");
            self.remove(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
