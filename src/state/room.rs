use super::{normalize_code, AppState};
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::store::StoreError;
use crate::types::*;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::broadcast;

const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;
const MAX_CODE_ATTEMPTS: usize = 10;
pub const MAX_NAME_CHARS: usize = 24;
pub const TARGET_SCORE_RANGE: std::ops::RangeInclusive<u32> = 1..=500;

/// Generate a random short room code (5 characters)
fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Trimmed display name, or why it was refused
pub fn validate_player_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidInput("Name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(GameError::InvalidInput(format!(
            "Name cannot be longer than {} characters",
            MAX_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

impl AppState {
    /// Create a room with its creator as the only player
    pub async fn create_room(
        &self,
        conn_id: &str,
        player_name: &str,
        target_score: u32,
        game_type: GameType,
    ) -> GameResult<(Room, broadcast::Receiver<ServerMessage>)> {
        let name = validate_player_name(player_name)?;
        if !TARGET_SCORE_RANGE.contains(&target_score) {
            return Err(GameError::InvalidInput(format!(
                "Target score must be between {} and {}",
                TARGET_SCORE_RANGE.start(),
                TARGET_SCORE_RANGE.end()
            )));
        }

        let host = Player {
            id: conn_id.to_string(),
            name,
            score: 0,
        };

        // Codes are short, so check for collisions before committing
        let mut attempts = 0;
        let room = loop {
            let room = Room::new(generate_room_code(), game_type, target_score, host.clone());
            match self.rooms.insert(room.clone()).await {
                Ok(()) => break room,
                Err(StoreError::Conflict(_)) if attempts + 1 < MAX_CODE_ATTEMPTS => {
                    attempts += 1;
                    tracing::debug!("Room code {} taken, retrying", room.code);
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            "Room {} created by {} ({:?}, target {})",
            room.code,
            host.name,
            game_type,
            target_score
        );

        let rx = self.hub.subscribe(&room.code, conn_id).await;
        self.hub
            .send(
                &room.code,
                ServerMessage::UpdatePlayers {
                    players: room.players.clone(),
                },
            )
            .await;

        Ok((room, rx))
    }

    /// Add a player to an existing room. Joining twice is a no-op.
    pub async fn join_room(
        &self,
        conn_id: &str,
        room_code: &str,
        player_name: &str,
    ) -> GameResult<(Room, broadcast::Receiver<ServerMessage>)> {
        let code = normalize_code(room_code);
        let name = validate_player_name(player_name)?;
        let _session = self.lock_room(&code).await?;

        let mut room = self.load_room(&code).await?;
        if room.has_player(conn_id) {
            let rx = self.hub.subscribe(&code, conn_id).await;
            return Ok((room, rx));
        }

        room.players.push(Player {
            id: conn_id.to_string(),
            name,
            score: 0,
        });
        room.touch();
        self.rooms.save(&room).await?;

        tracing::info!("{} joined room {}", conn_id, code);

        let rx = self.hub.subscribe(&code, conn_id).await;
        self.hub
            .send(
                &code,
                ServerMessage::UpdatePlayers {
                    players: room.players.clone(),
                },
            )
            .await;

        Ok((room, rx))
    }

    /// Zero the scores and start over with a fresh round
    pub async fn reset_room(self: &Arc<Self>, conn_id: &str, room_code: &str) -> GameResult<()> {
        let code = normalize_code(room_code);
        let mut session = self.lock_room(&code).await?;

        let mut room = self.load_room(&code).await?;
        if !room.has_player(conn_id) {
            return Err(GameError::InvalidState(
                "You are not in this room".to_string(),
            ));
        }

        room.reset();
        room.touch();
        self.rooms.save(&room).await?;

        tracing::info!("Room {} reset", code);
        self.hub
            .send(
                &code,
                ServerMessage::UpdatePlayers {
                    players: room.players,
                },
            )
            .await;

        self.open_round(&mut session, &code).await
    }

    /// Detach a connection from its room and re-check whatever quorum is open
    pub async fn leave_room(self: &Arc<Self>, conn_id: &str, room_code: &str) {
        let code = normalize_code(room_code);
        self.hub.leave(&code, conn_id).await;

        let mut session = match self.lock_room(&code).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Leave from {} ignored: {}", code, e);
                return;
            }
        };

        let result = match session.phase {
            RoundPhase::Open => self.check_vote_quorum(&mut session, &code).await,
            RoundPhase::Intermission | RoundPhase::SuddenDeath => {
                session.continue_requests.remove(conn_id);
                self.check_continue_quorum(&mut session, &code).await
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            tracing::warn!("Quorum check after {} left {} failed: {}", conn_id, code, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_generate_room_code() {
        let code = generate_room_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
    }

    #[test]
    fn test_validate_player_name() {
        assert_eq!(validate_player_name("  Ana ").unwrap(), "Ana");
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name(&"x".repeat(MAX_NAME_CHARS + 1)).is_err());
        assert!(validate_player_name(&"ñ".repeat(MAX_NAME_CHARS)).is_ok());
    }

    #[tokio::test]
    async fn test_create_room_rejects_bad_target() {
        let state = test_state();
        let result = state.create_room("c1", "Ana", 0, GameType::Movies).await;
        assert!(matches!(result, Err(GameError::InvalidInput(_))));
        let result = state.create_room("c1", "Ana", 501, GameType::Movies).await;
        assert!(matches!(result, Err(GameError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_join_is_case_insensitive_and_idempotent() {
        let state = test_state();
        let (room, mut host_rx) = state
            .create_room("c1", "Ana", 10, GameType::Movies)
            .await
            .unwrap();
        let _ = host_rx.recv().await;

        let (joined, _rx) = state
            .join_room("c2", &room.code.to_lowercase(), "Ben")
            .await
            .unwrap();
        assert_eq!(joined.players.len(), 2);

        match host_rx.recv().await {
            Ok(ServerMessage::UpdatePlayers { players }) => assert_eq!(players.len(), 2),
            other => panic!("Expected UpdatePlayers, got {:?}", other),
        }

        let (again, _rx) = state.join_room("c2", &room.code, "Ben").await.unwrap();
        assert_eq!(again.players.len(), 2);
        assert!(host_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let state = test_state();
        let result = state.join_room("c1", "ZZZZZ", "Ana").await;
        assert!(matches!(result, Err(GameError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_reset_zeroes_scores_and_opens_round() {
        let state = test_state();
        let (room, _rx) = state
            .create_room("c1", "Ana", 10, GameType::Movies)
            .await
            .unwrap();
        state.start_game("c1", &room.code).await.unwrap();

        let mut stored = state.load_room(&room.code).await.unwrap();
        stored.players[0].score = 9;
        stored.is_sudden_death = true;
        state.rooms.save(&stored).await.unwrap();

        state.reset_room("c1", &room.code).await.unwrap();

        let stored = state.load_room(&room.code).await.unwrap();
        assert_eq!(stored.players[0].score, 0);
        assert!(!stored.is_sudden_death);
        // Cleared, then the fresh round's subject
        assert_eq!(stored.used_subjects.len(), 1);
        assert_eq!(state.round_phase(&room.code).await, Some(RoundPhase::Open));
    }
}
