use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use crate::services::errors::chess_service_errors::ChessServiceError;

/// Business failures of the session protocol. They are carried to clients as
/// `"<Kind>Error: <message>"` strings, never raised across the boundary.
#[derive(Debug)]
pub enum GameSessionServiceError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Turn(String),
    IllegalMove(String),
    State(String),
    Internal(String),
}

impl GameSessionServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            GameSessionServiceError::Validation(_) => "ValidationError",
            GameSessionServiceError::NotFound(_) => "NotFoundError",
            GameSessionServiceError::Conflict(_) => "ConflictError",
            GameSessionServiceError::Turn(_) => "TurnError",
            GameSessionServiceError::IllegalMove(_) => "IllegalMoveError",
            GameSessionServiceError::State(_) => "StateError",
            GameSessionServiceError::Internal(_) => "InternalError",
        }
    }

    fn message(&self) -> &str {
        match self {
            GameSessionServiceError::Validation(msg)
            | GameSessionServiceError::NotFound(msg)
            | GameSessionServiceError::Conflict(msg)
            | GameSessionServiceError::Turn(msg)
            | GameSessionServiceError::IllegalMove(msg)
            | GameSessionServiceError::State(msg)
            | GameSessionServiceError::Internal(msg) => msg,
        }
    }
}

impl std::fmt::Display for GameSessionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for GameSessionServiceError {}

impl From<GameRepositoryError> for GameSessionServiceError {
    fn from(err: GameRepositoryError) -> Self {
        match err {
            GameRepositoryError::NotFound(id) => {
                GameSessionServiceError::NotFound(format!("record {} does not exist", id))
            }
            // a concurrent writer got there first; the caller's view of the game is stale
            GameRepositoryError::SequenceConflict { .. } => {
                GameSessionServiceError::State(err.to_string())
            }
            GameRepositoryError::Storage(_) => GameSessionServiceError::Internal(err.to_string()),
        }
    }
}

impl From<ChessServiceError> for GameSessionServiceError {
    fn from(err: ChessServiceError) -> Self {
        match err {
            ChessServiceError::ValidationError(msg) => GameSessionServiceError::Validation(msg),
            ChessServiceError::IllegalMove(msg) => GameSessionServiceError::IllegalMove(msg),
            ChessServiceError::InvalidPosition(msg) => GameSessionServiceError::Internal(msg),
        }
    }
}
