use crate::protocol::ServerMessage;
use crate::types::{ConnectionId, RoomCode};
use std::collections::{HashMap, HashSet};
use tokio::sync::{broadcast, RwLock};

const CHANNEL_CAPACITY: usize = 64;

struct RoomChannel {
    tx: broadcast::Sender<ServerMessage>,
    members: HashSet<ConnectionId>,
}

/// Per-room broadcast groups and the connections currently attached to them
#[derive(Default)]
pub struct RoomHub {
    channels: RwLock<HashMap<RoomCode, RoomChannel>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection to a room's group
    pub async fn subscribe(
        &self,
        code: &str,
        conn_id: &str,
    ) -> broadcast::Receiver<ServerMessage> {
        let mut channels = self.channels.write().await;
        let channel = channels.entry(code.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
            RoomChannel {
                tx,
                members: HashSet::new(),
            }
        });
        channel.members.insert(conn_id.to_string());
        channel.tx.subscribe()
    }

    /// Detach a connection; the group goes away with its last member
    pub async fn leave(&self, code: &str, conn_id: &str) {
        let mut channels = self.channels.write().await;
        if let Some(channel) = channels.get_mut(code) {
            channel.members.remove(conn_id);
            if channel.members.is_empty() {
                channels.remove(code);
                tracing::debug!("Room {} has no connections left", code);
            }
        }
    }

    pub async fn send(&self, code: &str, msg: ServerMessage) {
        if let Some(channel) = self.channels.read().await.get(code) {
            // No live receivers is fine
            let _ = channel.tx.send(msg);
        }
    }

    pub async fn connected(&self, code: &str) -> HashSet<ConnectionId> {
        self.channels
            .read()
            .await
            .get(code)
            .map(|channel| channel.members.clone())
            .unwrap_or_default()
    }

    pub async fn room_count(&self) -> usize {
        self.channels.read().await.len()
    }
}
