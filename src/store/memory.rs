use super::*;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process room store
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<RoomCode, Room>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn insert(&self, room: Room) -> StoreResult<()> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.code) {
            return Err(StoreError::Conflict(format!(
                "room {} already exists",
                room.code
            )));
        }
        rooms.insert(room.code.clone(), room);
        Ok(())
    }

    async fn find(&self, code: &RoomCode) -> StoreResult<Option<Room>> {
        Ok(self.rooms.read().await.get(code).cloned())
    }

    async fn save(&self, room: &Room) -> StoreResult<()> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(&room.code) {
            Some(existing) => {
                *existing = room.clone();
                Ok(())
            }
            None => Err(StoreError::Unavailable(format!(
                "room {} is not stored",
                room.code
            ))),
        }
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.rooms.read().await.len())
    }
}

/// In-process subject ledger with a retention window.
///
/// Expired entries are ignored on read and dropped on the next write, so
/// nothing has to delete them explicitly.
pub struct MemoryLedger {
    ttl: Duration,
    entries: RwLock<HashMap<(GameType, String), DateTime<Utc>>>,
}

impl MemoryLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record a use at an explicit instant. Returns whether the entry is new.
    pub async fn record_use_at(
        &self,
        game_type: GameType,
        subject_id: &str,
        at: DateTime<Utc>,
    ) -> bool {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, recorded| now - *recorded < self.ttl);

        let key = (game_type, subject_id.to_string());
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, at);
        true
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

#[async_trait]
impl SubjectLedger for MemoryLedger {
    async fn record_use(&self, game_type: GameType, subject_id: &str) -> StoreResult<bool> {
        Ok(self.record_use_at(game_type, subject_id, Utc::now()).await)
    }

    async fn release(&self, game_type: GameType, subject_id: &str) -> StoreResult<()> {
        self.entries
            .write()
            .await
            .remove(&(game_type, subject_id.to_string()));
        Ok(())
    }

    async fn list_used(&self, game_type: GameType) -> StoreResult<HashSet<String>> {
        let now = Utc::now();
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|((kind, _), recorded)| *kind == game_type && now - **recorded < self.ttl)
            .map(|((_, id), _)| id.clone())
            .collect())
    }
}
