use super::{normalize_code, AppState, RoundSession};
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

impl AppState {
    /// Start the first round of a room
    pub async fn start_game(self: &Arc<Self>, conn_id: &str, room_code: &str) -> GameResult<()> {
        let code = normalize_code(room_code);
        let mut session = self.lock_room(&code).await?;

        let room = self.load_room(&code).await?;
        if !room.has_player(conn_id) {
            return Err(GameError::InvalidState(
                "You are not in this room".to_string(),
            ));
        }
        if session.phase != RoundPhase::Idle {
            return Err(GameError::InvalidState(
                "The game has already started".to_string(),
            ));
        }

        tracing::info!("Starting game in room {}", code);
        self.open_round(&mut session, &code).await
    }

    /// Draw a subject, store the answer key and announce the round.
    ///
    /// Must be called with the room's session locked. Any round that was
    /// pending for this room is superseded.
    pub(crate) async fn open_round(
        &self,
        session: &mut RoundSession,
        code: &str,
    ) -> GameResult<()> {
        session.generation += 1;
        session.selections.clear();
        session.continue_requests.clear();
        session.participants.clear();

        match self.prepare_round(code).await {
            Ok((announcement, participants)) => {
                session.participants = participants;
                session.phase = RoundPhase::Open;
                self.hub.send(code, announcement).await;
                Ok(())
            }
            Err(e) => {
                session.phase = RoundPhase::Idle;
                tracing::warn!("Could not open a round in room {}: {}", code, e);
                if e.is_room_wide() {
                    self.hub.send(code, e.to_message()).await;
                }
                Err(e)
            }
        }
    }

    /// Draw and persist the round. Returns the announcement and the ids of
    /// the players it is dealt to.
    async fn prepare_round(
        &self,
        code: &str,
    ) -> GameResult<(ServerMessage, HashSet<ConnectionId>)> {
        let mut room = self.load_room(code).await?;

        // The draw claims the subject in the ledger
        let (subject_id, answer_key, prompt) = match room.game_type {
            GameType::Movies => self.draw_movie_round(&room).await?,
            GameType::Clubs => self.draw_club_round(&mut room).await?,
        };

        room.used_subjects.push(subject_id.clone());
        room.answer_key = Some(answer_key);
        room.touch();
        if let Err(e) = self.rooms.save(&room).await {
            self.release_subject(room.game_type, &subject_id).await;
            return Err(e.into());
        }

        let participants = room
            .round_participants()
            .into_iter()
            .map(|p| p.id.clone())
            .collect();

        let announcement = ServerMessage::NewRound {
            game_type: room.game_type,
            prompt,
            is_sudden_death: room.is_sudden_death,
            tied_player_ids: room.tied_player_ids.clone(),
        };
        Ok((announcement, participants))
    }

    /// Give back a ledger claim for a subject that will not be played
    pub(crate) async fn release_subject(&self, game_type: GameType, subject_id: &str) {
        if let Err(e) = self.ledger.release(game_type, subject_id).await {
            tracing::warn!("Failed to release {} from the ledger: {}", subject_id, e);
        }
    }

    /// Open the next round after `delay`, unless the room moved on meanwhile
    pub(crate) fn schedule_round(self: &Arc<Self>, code: &str, generation: u64, delay: Duration) {
        let state = Arc::clone(self);
        let code = code.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut session = match state.lock_room(&code).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!("Scheduled round for {} dropped: {}", code, e);
                    return;
                }
            };

            let waiting = matches!(
                session.phase,
                RoundPhase::Intermission | RoundPhase::SuddenDeath
            );
            if session.generation != generation || !waiting {
                tracing::debug!("Scheduled round for {} is stale", code);
                return;
            }

            if let Err(e) = state.open_round(&mut session, &code).await {
                tracing::error!("Scheduled round for {} failed: {}", code, e);
            }
        });
    }
}
