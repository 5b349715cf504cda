mod clubs;
mod movies;
mod room;
mod round;
pub mod score;
mod submission;

use crate::broadcast::RoomHub;
use crate::config::ServerConfig;
use crate::error::{GameError, GameResult};
use crate::provider::{FootballProvider, MovieProvider};
use crate::store::{RoomStore, SubjectLedger};
use crate::types::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Transient per-room round state, guarded by the room's mutex
#[derive(Debug)]
pub struct RoundSession {
    pub phase: RoundPhase,
    /// Bumped every time a round opens; scheduled openings carry the value
    /// they were scheduled for.
    pub generation: u64,
    /// Players the open round was dealt to
    pub participants: HashSet<ConnectionId>,
    pub selections: HashMap<ConnectionId, Vec<String>>,
    pub continue_requests: HashSet<ConnectionId>,
}

impl Default for RoundSession {
    fn default() -> Self {
        Self {
            phase: RoundPhase::Idle,
            generation: 0,
            participants: HashSet::new(),
            selections: HashMap::new(),
            continue_requests: HashSet::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    pub rooms: Arc<dyn RoomStore>,
    pub ledger: Arc<dyn SubjectLedger>,
    pub movies: Arc<dyn MovieProvider>,
    pub football: Arc<dyn FootballProvider>,
    pub hub: RoomHub,
    sessions: RwLock<HashMap<RoomCode, Arc<Mutex<RoundSession>>>>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        rooms: Arc<dyn RoomStore>,
        ledger: Arc<dyn SubjectLedger>,
        movies: Arc<dyn MovieProvider>,
        football: Arc<dyn FootballProvider>,
    ) -> Self {
        Self {
            config,
            rooms,
            ledger,
            movies,
            football,
            hub: RoomHub::new(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Serialize access to one room. Unknown codes never get a session.
    pub(crate) async fn lock_room(&self, code: &str) -> GameResult<OwnedMutexGuard<RoundSession>> {
        let existing = self.sessions.read().await.get(code).cloned();
        let session = match existing {
            Some(session) => session,
            None => {
                if self.rooms.find(&code.to_string()).await?.is_none() {
                    return Err(GameError::RoomNotFound(code.to_string()));
                }
                self.sessions
                    .write()
                    .await
                    .entry(code.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(RoundSession::default())))
                    .clone()
            }
        };
        Ok(session.lock_owned().await)
    }

    pub(crate) async fn load_room(&self, code: &str) -> GameResult<Room> {
        self.rooms
            .find(&code.to_string())
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))
    }

    /// Current phase of a room's round state machine
    pub async fn round_phase(&self, code: &str) -> Option<RoundPhase> {
        let session = self.sessions.read().await.get(&normalize_code(code)).cloned()?;
        let phase = session.lock().await.phase;
        Some(phase)
    }
}

/// Room codes are matched case-insensitively
pub fn normalize_code(code: &str) -> RoomCode {
    code.trim().to_uppercase()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::provider::*;
    use crate::store::{MemoryLedger, MemoryRoomStore};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Movie provider serving the same filmography for every person
    pub struct FakeMovies {
        pub people: Vec<PersonSummary>,
        pub credits: Vec<MovieCredit>,
    }

    pub fn credit(title: &str, vote_average: f64, vote_count: u32) -> MovieCredit {
        MovieCredit {
            title: title.to_string(),
            poster_path: Some(format!("/{}.jpg", title.to_lowercase())),
            vote_average,
            vote_count,
        }
    }

    impl Default for FakeMovies {
        fn default() -> Self {
            Self {
                people: (1..=6)
                    .map(|id| PersonSummary {
                        id,
                        name: format!("Actor {}", id),
                    })
                    .collect(),
                credits: vec![
                    credit("X", 9.0, 900),
                    credit("Y", 8.5, 800),
                    credit("Z", 8.0, 700),
                    credit("Q", 7.5, 600),
                    credit("W", 7.0, 500),
                    credit("Cameo", 9.9, 12),
                    credit("Flop", 3.0, 1000),
                ],
            }
        }
    }

    #[async_trait]
    impl MovieProvider for FakeMovies {
        async fn popular_people(&self, _page: u32) -> ProviderResult<Vec<PersonSummary>> {
            Ok(self.people.clone())
        }

        async fn movie_credits(&self, _person_id: u64) -> ProviderResult<Vec<MovieCredit>> {
            Ok(self.credits.clone())
        }

        async fn search_movies(&self, query: &str) -> ProviderResult<Vec<MovieSearchResult>> {
            Ok(self
                .credits
                .iter()
                .enumerate()
                .filter(|(_, c)| c.title.contains(query))
                .map(|(i, c)| MovieSearchResult {
                    id: i as u64,
                    title: c.title.clone(),
                    release_date: None,
                    poster_path: c.poster_path.clone(),
                })
                .collect())
        }

        fn poster_url(&self, poster_path: &str) -> String {
            format!("https://img.test{}", poster_path)
        }

        fn name(&self) -> &str {
            "fake-movies"
        }
    }

    /// Football provider where every known player moved Santos -> Barcelona -> PSG
    #[derive(Default)]
    pub struct FakeFootball {
        pub unknown: Vec<String>,
    }

    #[async_trait]
    impl FootballProvider for FakeFootball {
        async fn search_player(&self, name: &str) -> ProviderResult<Option<FootballerSummary>> {
            if self.unknown.iter().any(|n| n == name) {
                return Ok(None);
            }
            Ok(Some(FootballerSummary {
                id: name.len() as u64,
                name: name.to_string(),
            }))
        }

        async fn transfers(&self, _player_id: u64) -> ProviderResult<Vec<Transfer>> {
            Ok(vec![
                Transfer {
                    joined: Some("Barcelona".to_string()),
                    left: Some("Santos".to_string()),
                },
                Transfer {
                    joined: Some("PSG".to_string()),
                    left: Some("Barcelona".to_string()),
                },
            ])
        }

        async fn league_teams(&self) -> ProviderResult<Vec<String>> {
            Ok([
                "Barcelona", "Sevilla", "Betis", "Girona", "Getafe", "Osasuna", "Celta",
                "Mallorca", "Alaves", "Cadiz", "Granada",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect())
        }

        fn name(&self) -> &str {
            "fake-football"
        }
    }

    pub fn test_config() -> ServerConfig {
        ServerConfig {
            round_delay: Duration::from_millis(20),
            sudden_death_delay: Duration::from_millis(20),
            ..ServerConfig::default()
        }
    }

    pub fn test_state() -> Arc<AppState> {
        state_with(test_config(), FakeMovies::default(), FakeFootball::default())
    }

    pub fn state_with(
        config: ServerConfig,
        movies: FakeMovies,
        football: FakeFootball,
    ) -> Arc<AppState> {
        Arc::new(AppState::new(
            config,
            Arc::new(MemoryRoomStore::new()),
            Arc::new(MemoryLedger::default()),
            Arc::new(movies),
            Arc::new(football),
        ))
    }
}
