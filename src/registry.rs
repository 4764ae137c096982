//! In-memory table of currently open connections.
//!
//! Bookkeeping only: fan-out goes through the gateway's broadcast channel,
//! never by iterating this table.

use crate::types::ConnectionId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Metadata kept per open connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connected_at: DateTime<Utc>,
}

/// Registry of open connections, keyed by transport-assigned sid
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionInfo>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection. Registering an already-known sid just refreshes
    /// its connect timestamp; it is not an error.
    pub async fn register(&self, sid: &str) {
        let mut connections = self.connections.write().await;
        connections.insert(
            sid.to_string(),
            ConnectionInfo {
                connected_at: Utc::now(),
            },
        );
        tracing::info!("Client {} registered. Total: {}", sid, connections.len());
    }

    /// Forget a connection. Unknown sids are a no-op.
    pub async fn deregister(&self, sid: &str) {
        let mut connections = self.connections.write().await;
        connections.remove(sid);
        tracing::info!("Client {} deregistered. Total: {}", sid, connections.len());
    }

    pub async fn contains(&self, sid: &str) -> bool {
        self.connections.read().await.contains_key(sid)
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
