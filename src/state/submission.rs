use super::score::{self, RoundOutcome};
use super::{normalize_code, AppState, RoundSession};
use crate::error::{GameError, GameResult};
use crate::protocol::{PlayerRoundScore, RevealedAnswer, ServerMessage};
use crate::types::*;
use std::collections::HashSet;
use std::sync::Arc;

impl AppState {
    /// Record a player's picks for the open round; the last submission wins
    pub async fn submit_selection(
        self: &Arc<Self>,
        conn_id: &str,
        room_code: &str,
        selection: Vec<String>,
    ) -> GameResult<()> {
        let code = normalize_code(room_code);
        let mut session = self.lock_room(&code).await?;

        if session.phase != RoundPhase::Open {
            return Err(GameError::InvalidState(
                "No round is accepting selections".to_string(),
            ));
        }

        if !session.participants.contains(conn_id) {
            return Err(GameError::InvalidState(
                "You are not playing this round".to_string(),
            ));
        }

        let selection = score::sanitize_selection(selection);
        if selection.len() > self.config.max_picks {
            return Err(GameError::InvalidInput(format!(
                "Pick at most {} answers",
                self.config.max_picks
            )));
        }

        session.selections.insert(conn_id.to_string(), selection);
        self.check_vote_quorum(&mut session, &code).await
    }

    /// Players dealt into this round who are still connected
    async fn eligible_submitters(
        &self,
        session: &RoundSession,
        code: &str,
    ) -> HashSet<ConnectionId> {
        let connected = self.hub.connected(code).await;
        session
            .participants
            .iter()
            .filter(|id| connected.contains(*id))
            .cloned()
            .collect()
    }

    /// Broadcast progress and score the round once everyone eligible is in
    pub(crate) async fn check_vote_quorum(
        self: &Arc<Self>,
        session: &mut RoundSession,
        code: &str,
    ) -> GameResult<()> {
        let room = self.load_room(code).await?;
        let eligible = self.eligible_submitters(session, code).await;
        let received = eligible
            .iter()
            .filter(|id| session.selections.contains_key(*id))
            .count();
        let total = eligible.len();

        self.hub
            .send(code, ServerMessage::UpdateVoteCount { received, total })
            .await;

        if total > 0 && received == total {
            self.score_round(session, room).await?;
        } else if total == 0 {
            if session.selections.is_empty() {
                self.abandon_round(session, room).await?;
            } else {
                self.score_round(session, room).await?;
            }
        }
        Ok(())
    }

    /// End an open round that every player left before submitting.
    ///
    /// A tiebreak is settled as a shared victory of the tied players; a
    /// regular round drops the room back to Idle so it can be restarted.
    async fn abandon_round(&self, session: &mut RoundSession, mut room: Room) -> GameResult<()> {
        if !room.is_sudden_death {
            tracing::warn!("Every player of the round in {} left", room.code);
            session.phase = RoundPhase::Idle;
            self.hub
                .send(
                    &room.code,
                    ServerMessage::error(
                        "ROUND_ABANDONED",
                        "Everyone playing the round left, start the game again",
                    ),
                )
                .await;
            return Ok(());
        }

        let winner_name = room
            .tied_player_ids
            .iter()
            .filter_map(|id| room.player(id).map(|p| p.name.as_str()))
            .collect::<Vec<_>>()
            .join(" & ");
        room.is_sudden_death = false;
        room.tied_player_ids.clear();
        room.touch();
        self.rooms.save(&room).await?;

        tracing::info!("Every tied player left {}, the tiebreak is shared", room.code);
        self.finish_game(session, &room, winner_name).await;
        Ok(())
    }

    async fn score_round(
        self: &Arc<Self>,
        session: &mut RoundSession,
        mut room: Room,
    ) -> GameResult<()> {
        let Some(answer_key) = room.answer_key.clone() else {
            return Err(GameError::InvalidState(
                "The round has no answer key".to_string(),
            ));
        };
        session.phase = RoundPhase::Scoring;

        let answers = answer_key.correct_answers();
        let sudden_death = room.is_sudden_death;
        let mut player_scores: Vec<PlayerRoundScore> = Vec::new();

        for player in room.players.iter_mut() {
            let Some(selection) = session.selections.get(&player.id) else {
                continue;
            };
            let hits = score::count_hits(selection, &answers);
            let points = if sudden_death {
                0
            } else {
                score::round_points(room.game_type, hits, &self.config)
            };
            player.score += points;
            player_scores.push(PlayerRoundScore {
                player_id: player.id.clone(),
                name: player.name.clone(),
                hits,
                points,
                selection: selection.clone(),
            });
        }

        let outcome = if sudden_death {
            room.is_sudden_death = false;
            room.tied_player_ids.clear();
            None
        } else {
            let outcome = score::decide_outcome(&room.players, room.target_score);
            if let RoundOutcome::SuddenDeath(ids) = &outcome {
                room.is_sudden_death = true;
                room.tied_player_ids = ids.clone();
            }
            Some(outcome)
        };

        room.touch();
        if let Err(e) = self.rooms.save(&room).await {
            // Selections are kept so the next submission retries
            session.phase = RoundPhase::Open;
            tracing::error!("Failed to save scores for room {}: {}", room.code, e);
            return Err(e.into());
        }
        session.selections.clear();

        tracing::info!(
            "Room {} scored {} submissions{}",
            room.code,
            player_scores.len(),
            if sudden_death { " (sudden death)" } else { "" }
        );

        self.hub
            .send(
                &room.code,
                ServerMessage::RoundResult {
                    game_type: room.game_type,
                    answer: RevealedAnswer::from(&answer_key),
                    player_scores: player_scores.clone(),
                    updated_players: room.players.clone(),
                },
            )
            .await;

        match outcome {
            None => {
                let hits: Vec<usize> = player_scores.iter().map(|s| s.hits).collect();
                let winner_name = score::best_by_hits(&hits)
                    .into_iter()
                    .map(|i| player_scores[i].name.as_str())
                    .collect::<Vec<_>>()
                    .join(" & ");
                self.finish_game(session, &room, winner_name).await;
            }
            Some(RoundOutcome::Winner(id)) => {
                let winner_name = room.player(&id).map(|p| p.name.clone()).unwrap_or_default();
                self.finish_game(session, &room, winner_name).await;
            }
            Some(RoundOutcome::SuddenDeath(ids)) => {
                let tied_players = ids
                    .iter()
                    .filter_map(|id| room.player(id).map(|p| p.name.clone()))
                    .collect();
                tracing::info!("Room {} goes to sudden death", room.code);
                self.hub
                    .send(&room.code, ServerMessage::SuddenDeathTie { tied_players })
                    .await;
                session.phase = RoundPhase::SuddenDeath;
                self.schedule_round(
                    &room.code,
                    session.generation,
                    self.config.sudden_death_delay,
                );
            }
            Some(RoundOutcome::Continue) => {
                session.phase = RoundPhase::Intermission;
                self.schedule_round(&room.code, session.generation, self.config.round_delay);
            }
        }
        Ok(())
    }

    async fn finish_game(&self, session: &mut RoundSession, room: &Room, winner_name: String) {
        tracing::info!("Room {} won by {}", room.code, winner_name);
        session.phase = RoundPhase::GameOver;
        self.hub
            .send(
                &room.code,
                ServerMessage::GameOver {
                    winner_name,
                    final_scores: room.final_scores(),
                },
            )
            .await;
    }

    /// Vote to skip the wait before the next round
    pub async fn request_next_round(
        self: &Arc<Self>,
        conn_id: &str,
        room_code: &str,
    ) -> GameResult<()> {
        let code = normalize_code(room_code);
        let mut session = self.lock_room(&code).await?;

        if !matches!(
            session.phase,
            RoundPhase::Intermission | RoundPhase::SuddenDeath
        ) {
            return Err(GameError::InvalidState(
                "There is no round to move on to".to_string(),
            ));
        }

        let room = self.load_room(&code).await?;
        if !room.has_player(conn_id) {
            return Err(GameError::InvalidState(
                "You are not in this room".to_string(),
            ));
        }

        session.continue_requests.insert(conn_id.to_string());
        self.check_continue_quorum(&mut session, &code).await
    }

    pub(crate) async fn check_continue_quorum(
        self: &Arc<Self>,
        session: &mut RoundSession,
        code: &str,
    ) -> GameResult<()> {
        let room = self.load_room(code).await?;
        let connected = self.hub.connected(code).await;
        let members: Vec<&Player> = room
            .players
            .iter()
            .filter(|p| connected.contains(&p.id))
            .collect();
        let received = members
            .iter()
            .filter(|p| session.continue_requests.contains(&p.id))
            .count();
        let total = members.len();

        self.hub
            .send(code, ServerMessage::UpdateContinueCount { received, total })
            .await;

        if total > 0 && received == total {
            tracing::info!("Everyone in {} is ready, opening the next round", code);
            self.open_round(session, code).await?;
        }
        Ok(())
    }
}
