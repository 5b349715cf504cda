use crate::protocol::ServerMessage;
use crate::provider::ProviderError;
use crate::store::StoreError;

pub type GameResult<T> = Result<T, GameError>;

/// Failures of room and round operations
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("No subjects available: {0}")]
    NoSubjectsAvailable(String),

    #[error("Data provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidState(String),
}

impl GameError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::Persistence(_) => "PERSISTENCE_ERROR",
            GameError::NoSubjectsAvailable(_) => "NO_SUBJECTS",
            GameError::Provider(_) => "PROVIDER_ERROR",
            GameError::InvalidInput(_) => "INVALID_INPUT",
            GameError::InvalidState(_) => "INVALID_STATE",
        }
    }

    /// Whether the whole room should hear about this failure
    pub fn is_room_wide(&self) -> bool {
        matches!(
            self,
            GameError::NoSubjectsAvailable(_) | GameError::Provider(_)
        )
    }

    pub fn to_message(&self) -> ServerMessage {
        let msg = match self {
            // Store details stay in the logs
            GameError::Persistence(_) => "Could not save the room, please try again".to_string(),
            other => other.to_string(),
        };
        ServerMessage::error(self.code(), msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_message_is_generic() {
        let err = GameError::from(StoreError::Unavailable("socket closed".to_string()));
        match err.to_message() {
            ServerMessage::Error { code, msg } => {
                assert_eq!(code, "PERSISTENCE_ERROR");
                assert!(!msg.contains("socket"));
            }
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[test]
    fn test_room_wide_errors() {
        assert!(GameError::NoSubjectsAvailable("pool".into()).is_room_wide());
        assert!(GameError::from(ProviderError::ApiError("500".into())).is_room_wide());
        assert!(!GameError::RoomNotFound("ABCDE".into()).is_room_wide());
    }
}
