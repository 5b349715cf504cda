//! Persistence seams for rooms and the anti-repeat ledger.

pub mod memory;

use crate::types::{GameType, Room, RoomCode};
use async_trait::async_trait;
use std::collections::HashSet;

pub use memory::{MemoryLedger, MemoryRoomStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),
}

/// Room registry storage, keyed by room code
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert a new room; fails with `Conflict` when the code is taken
    async fn insert(&self, room: Room) -> StoreResult<()>;

    async fn find(&self, code: &RoomCode) -> StoreResult<Option<Room>>;

    /// Overwrite an existing room document
    async fn save(&self, room: &Room) -> StoreResult<()>;

    async fn count(&self) -> StoreResult<usize>;
}

/// Global record of recently used round subjects
#[async_trait]
pub trait SubjectLedger: Send + Sync {
    /// Claim a subject; `false` when it is already recorded and still live
    async fn record_use(&self, game_type: GameType, subject_id: &str) -> StoreResult<bool>;

    /// Drop a claim for a subject that ended up not being played
    async fn release(&self, game_type: GameType, subject_id: &str) -> StoreResult<()>;

    /// Subjects used within the retention window
    async fn list_used(&self, game_type: GameType) -> StoreResult<HashSet<String>>;
}
