use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::{RoundPrompt, ServerMessage};
use crate::provider::Transfer;
use crate::types::*;
use rand::seq::SliceRandom;
use rand::Rng;

/// Every club the footballer joined or left, first appearance first
pub fn clubs_from_transfers(transfers: &[Transfer]) -> Vec<String> {
    let mut clubs: Vec<String> = Vec::new();
    for name in transfers
        .iter()
        .flat_map(|t| [t.joined.as_ref(), t.left.as_ref()])
        .flatten()
    {
        if !clubs.contains(name) {
            clubs.push(name.clone());
        }
    }
    clubs
}

/// Correct clubs topped up with league distractors, shuffled
pub fn build_club_options<R: Rng + ?Sized>(
    correct: &[String],
    league_teams: &[String],
    option_count: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut distractors: Vec<&String> = Vec::new();
    for team in league_teams {
        if !correct.contains(team) && !distractors.contains(&team) {
            distractors.push(team);
        }
    }
    distractors.shuffle(rng);

    let missing = option_count.saturating_sub(correct.len());
    let mut options: Vec<String> = correct.to_vec();
    options.extend(distractors.into_iter().take(missing).cloned());
    options.shuffle(rng);
    options
}

impl AppState {
    /// Pick a footballer from the configured pool and build the club round.
    ///
    /// Clears the room's used list when it has exhausted the pool.
    pub(crate) async fn draw_club_round(
        &self,
        room: &mut Room,
    ) -> GameResult<(SubjectId, AnswerKey, RoundPrompt)> {
        let used = self.ledger.list_used(GameType::Clubs).await?;
        let pool = &self.config.footballer_pool;

        let globally_free: Vec<&String> = pool.iter().filter(|n| !used.contains(*n)).collect();
        if globally_free.is_empty() {
            return Err(GameError::NoSubjectsAvailable(
                "Every footballer has been played recently".to_string(),
            ));
        }

        let mut candidates: Vec<String> = globally_free
            .iter()
            .filter(|n| !room.used_subjects.contains(**n))
            .map(|n| n.to_string())
            .collect();

        if candidates.is_empty() {
            tracing::warn!("Room {} exhausted the footballer pool, starting over", room.code);
            self.hub
                .send(
                    &room.code,
                    ServerMessage::error(
                        "POOL_RESET",
                        "Every footballer has been played in this room, starting over",
                    ),
                )
                .await;
            room.used_subjects.clear();
            candidates = globally_free.iter().map(|n| n.to_string()).collect();
        }

        candidates.shuffle(&mut rand::rng());
        candidates.truncate(self.config.max_subject_draws);

        for name in candidates {
            if !self.ledger.record_use(GameType::Clubs, &name).await? {
                tracing::debug!("{} was claimed by another room", name);
                continue;
            }

            let picked = self.fetch_club_history(&name).await;
            let correct_clubs = match picked {
                Ok(Some(clubs)) => clubs,
                Ok(None) => {
                    self.release_subject(GameType::Clubs, &name).await;
                    continue;
                }
                Err(e) => {
                    self.release_subject(GameType::Clubs, &name).await;
                    return Err(e);
                }
            };

            let teams = match self.football.league_teams().await {
                Ok(teams) => teams,
                Err(e) => {
                    self.release_subject(GameType::Clubs, &name).await;
                    return Err(e.into());
                }
            };
            let club_options = build_club_options(
                &correct_clubs,
                &teams,
                self.config.club_option_count,
                &mut rand::rng(),
            );

            tracing::info!("Room {} plays {}", room.code, name);
            return Ok((
                name.clone(),
                AnswerKey::Clubs {
                    footballer_name: name.clone(),
                    correct_clubs,
                },
                RoundPrompt::Clubs {
                    footballer_name: name,
                    club_options,
                },
            ));
        }

        Err(GameError::NoSubjectsAvailable(
            "Could not find a footballer with a known club history".to_string(),
        ))
    }

    /// Clubs of a pool footballer, or `None` when the provider has nothing usable
    async fn fetch_club_history(&self, name: &str) -> GameResult<Option<Vec<String>>> {
        let Some(player) = self.football.search_player(name).await? else {
            tracing::debug!("{} is unknown to {}", name, self.football.name());
            return Ok(None);
        };

        let transfers = self.football.transfers(player.id).await?;
        let clubs = clubs_from_transfers(&transfers);
        if clubs.is_empty() {
            tracing::debug!("{} has no recorded clubs", name);
            return Ok(None);
        }
        Ok(Some(clubs))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::ServerConfig;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn room_with_used(used: &[&str]) -> Room {
        let mut room = Room::new(
            "CLUBS".into(),
            GameType::Clubs,
            10,
            Player {
                id: "c1".into(),
                name: "Ana".into(),
                score: 0,
            },
        );
        room.used_subjects = names(used);
        room
    }

    #[test]
    fn test_clubs_from_transfers_dedups() {
        let transfers = vec![
            Transfer {
                joined: Some("Barcelona".into()),
                left: Some("Santos".into()),
            },
            Transfer {
                joined: Some("PSG".into()),
                left: Some("Barcelona".into()),
            },
            Transfer {
                joined: None,
                left: Some("PSG".into()),
            },
        ];
        assert_eq!(
            clubs_from_transfers(&transfers),
            names(&["Barcelona", "Santos", "PSG"])
        );
    }

    #[test]
    fn test_club_options_are_topped_up_to_count() {
        let correct = names(&["Barcelona", "Santos"]);
        let teams = names(&["Barcelona", "Sevilla", "Betis", "Girona", "Getafe"]);

        let options = build_club_options(&correct, &teams, 4, &mut rand::rng());
        assert_eq!(options.len(), 4);
        assert!(options.contains(&"Barcelona".to_string()));
        assert!(options.contains(&"Santos".to_string()));
        assert_eq!(options.iter().filter(|o| *o == "Barcelona").count(), 1);

        // A short roster just yields fewer options
        let options = build_club_options(&correct, &names(&["Betis"]), 10, &mut rand::rng());
        assert_eq!(options.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_footballer_is_skipped() {
        let config = ServerConfig {
            footballer_pool: names(&["Ghost", "Neymar"]),
            ..test_config()
        };
        let football = FakeFootball {
            unknown: names(&["Ghost"]),
        };
        let state = state_with(config, FakeMovies::default(), football);
        let mut room = room_with_used(&[]);

        let (subject, key, prompt) = state.draw_club_round(&mut room).await.unwrap();
        assert_eq!(subject, "Neymar");
        assert_eq!(key.correct_answers(), vec!["Barcelona", "Santos", "PSG"]);
        assert_eq!(prompt.options().len(), 10);

        let used = state.ledger.list_used(GameType::Clubs).await.unwrap();
        assert!(used.contains("Neymar"));
        assert!(!used.contains("Ghost"));
    }

    #[tokio::test]
    async fn test_room_pool_exhaustion_resets_used_list() {
        let config = ServerConfig {
            footballer_pool: names(&["Neymar", "Messi"]),
            ..test_config()
        };
        let state = state_with(config, FakeMovies::default(), FakeFootball::default());
        let mut room = room_with_used(&["Neymar", "Messi"]);

        let (subject, _, _) = state.draw_club_round(&mut room).await.unwrap();
        assert!(subject == "Neymar" || subject == "Messi");
        assert!(room.used_subjects.is_empty());
    }

    #[tokio::test]
    async fn test_global_exhaustion_soft_fails() {
        let config = ServerConfig {
            footballer_pool: names(&["Neymar"]),
            ..test_config()
        };
        let state = state_with(config, FakeMovies::default(), FakeFootball::default());
        state
            .ledger
            .record_use(GameType::Clubs, "Neymar")
            .await
            .unwrap();

        let result = state.draw_club_round(&mut room_with_used(&[])).await;
        assert!(matches!(result, Err(GameError::NoSubjectsAvailable(_))));
    }
}
