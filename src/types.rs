use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type ConnectionId = String;
pub type SubjectId = String;

/// Which flavour of the game a room plays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GameType {
    #[serde(rename = "top5movies")]
    Movies,
    #[serde(rename = "top5clubes")]
    Clubs,
}

impl GameType {
    /// Namespace used when recording subjects in the anti-repeat ledger
    pub fn ledger_namespace(&self) -> &'static str {
        match self {
            GameType::Movies => "actor",
            GameType::Clubs => "footballer",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    /// Connection identifier, reused as the player key for the room's lifetime
    pub id: ConnectionId,
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub title: String,
    pub poster: String,
}

/// Ground truth for the current round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKey {
    Movies {
        actor_name: String,
        top_movies: Vec<Movie>,
    },
    Clubs {
        footballer_name: String,
        correct_clubs: Vec<String>,
    },
}

impl AnswerKey {
    pub fn subject_name(&self) -> &str {
        match self {
            AnswerKey::Movies { actor_name, .. } => actor_name,
            AnswerKey::Clubs {
                footballer_name, ..
            } => footballer_name,
        }
    }

    /// Names a submission is graded against
    pub fn correct_answers(&self) -> Vec<&str> {
        match self {
            AnswerKey::Movies { top_movies, .. } => {
                top_movies.iter().map(|m| m.title.as_str()).collect()
            }
            AnswerKey::Clubs { correct_clubs, .. } => {
                correct_clubs.iter().map(String::as_str).collect()
            }
        }
    }
}

/// Persisted room document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub code: RoomCode,
    pub game_type: GameType,
    pub target_score: u32,
    pub players: Vec<Player>,
    pub answer_key: Option<AnswerKey>,
    /// Room-scoped anti-repeat list
    pub used_subjects: Vec<SubjectId>,
    pub is_sudden_death: bool,
    pub tied_player_ids: Vec<ConnectionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(code: RoomCode, game_type: GameType, target_score: u32, host: Player) -> Self {
        let now = Utc::now();
        Self {
            code,
            game_type,
            target_score,
            players: vec![host],
            answer_key: None,
            used_subjects: Vec::new(),
            is_sudden_death: false,
            tied_player_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn has_player(&self, id: &str) -> bool {
        self.player(id).is_some()
    }

    /// Players taking part in the current round: everybody, or only the tied
    /// leaders while a sudden-death round is being played.
    pub fn round_participants(&self) -> Vec<&Player> {
        if self.is_sudden_death {
            self.players
                .iter()
                .filter(|p| self.tied_player_ids.contains(&p.id))
                .collect()
        } else {
            self.players.iter().collect()
        }
    }

    pub fn final_scores(&self) -> Vec<FinalScore> {
        self.players
            .iter()
            .map(|p| FinalScore {
                name: p.name.clone(),
                score: p.score,
            })
            .collect()
    }

    /// Zero every score and forget round history
    pub fn reset(&mut self) {
        for player in &mut self.players {
            player.score = 0;
        }
        self.used_subjects.clear();
        self.answer_key = None;
        self.is_sudden_death = false;
        self.tied_player_ids.clear();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalScore {
    pub name: String,
    pub score: u32,
}

/// Phase of the per-room round state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    /// No round has been opened yet (or the last open attempt failed)
    Idle,
    /// Collecting selections
    Open,
    /// All selections are in and the round is being graded
    Scoring,
    /// Between two normal rounds
    Intermission,
    /// A tie was declared and the tiebreak round is pending
    SuddenDeath,
    GameOver,
}
