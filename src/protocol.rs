use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom {
        player_name: String,
        target_score: u32,
        game_type: GameType,
    },
    JoinRoom {
        room_code: RoomCode,
        player_name: String,
    },
    StartGame {
        room_code: RoomCode,
    },
    SubmitSelection {
        room_code: RoomCode,
        selection: Vec<String>,
    },
    /// Ask to move on once results have been shown
    RequestNextRound {
        room_code: RoomCode,
    },
    ResetGame {
        room_code: RoomCode,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomCreated {
        room_code: RoomCode,
    },
    JoinedRoom {
        room_code: RoomCode,
        game_type: GameType,
    },
    UpdatePlayers {
        players: Vec<Player>,
    },
    NewRound {
        game_type: GameType,
        #[serde(flatten)]
        prompt: RoundPrompt,
        is_sudden_death: bool,
        tied_player_ids: Vec<ConnectionId>,
    },
    UpdateVoteCount {
        received: usize,
        total: usize,
    },
    /// Progress of the "next round" quorum
    UpdateContinueCount {
        received: usize,
        total: usize,
    },
    RoundResult {
        game_type: GameType,
        #[serde(flatten)]
        answer: RevealedAnswer,
        player_scores: Vec<PlayerRoundScore>,
        updated_players: Vec<Player>,
    },
    SuddenDeathTie {
        tied_players: Vec<String>,
    },
    GameOver {
        winner_name: String,
        final_scores: Vec<FinalScore>,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Variant-specific part of a round-start event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum RoundPrompt {
    Movies {
        actor_name: String,
        movie_list: Vec<Movie>,
    },
    Clubs {
        footballer_name: String,
        club_options: Vec<String>,
    },
}

impl RoundPrompt {
    pub fn subject_name(&self) -> &str {
        match self {
            RoundPrompt::Movies { actor_name, .. } => actor_name,
            RoundPrompt::Clubs {
                footballer_name, ..
            } => footballer_name,
        }
    }

    /// Everything a player can pick from
    pub fn options(&self) -> Vec<&str> {
        match self {
            RoundPrompt::Movies { movie_list, .. } => {
                movie_list.iter().map(|m| m.title.as_str()).collect()
            }
            RoundPrompt::Clubs { club_options, .. } => {
                club_options.iter().map(String::as_str).collect()
            }
        }
    }
}

/// Variant-specific answer reveal in a round result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum RevealedAnswer {
    Movies { correct_movies: Vec<Movie> },
    Clubs { correct_clubs: Vec<String> },
}

impl From<&AnswerKey> for RevealedAnswer {
    fn from(key: &AnswerKey) -> Self {
        match key {
            AnswerKey::Movies { top_movies, .. } => RevealedAnswer::Movies {
                correct_movies: top_movies.clone(),
            },
            AnswerKey::Clubs { correct_clubs, .. } => RevealedAnswer::Clubs {
                correct_clubs: correct_clubs.clone(),
            },
        }
    }
}

/// Per-player detail of a scored round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRoundScore {
    pub player_id: ConnectionId,
    pub name: String,
    pub hits: usize,
    pub points: u32,
    pub selection: Vec<String>,
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}
