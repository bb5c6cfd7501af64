use std::fmt;

use crate::repositories::errors::{
    tournament_repository_errors::TournamentRepositoryError,
    user_repository_errors::UserRepositoryError,
};

#[derive(Debug)]
pub enum TournamentServiceError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    State(String),
    /// A game session operation failed; carries the protocol error string.
    GameSession(String),
    Repository(String),
}

impl TournamentServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            TournamentServiceError::Validation(_) => "ValidationError",
            TournamentServiceError::NotFound(_) => "NotFoundError",
            TournamentServiceError::Conflict(_) => "ConflictError",
            TournamentServiceError::State(_) => "StateError",
            TournamentServiceError::GameSession(_) => "GameSessionError",
            TournamentServiceError::Repository(_) => "RepositoryError",
        }
    }
}

impl fmt::Display for TournamentServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TournamentServiceError::Validation(msg)
            | TournamentServiceError::NotFound(msg)
            | TournamentServiceError::Conflict(msg)
            | TournamentServiceError::State(msg)
            | TournamentServiceError::GameSession(msg)
            | TournamentServiceError::Repository(msg) => write!(f, "{}: {}", self.kind(), msg),
        }
    }
}

impl std::error::Error for TournamentServiceError {}

impl From<TournamentRepositoryError> for TournamentServiceError {
    fn from(err: TournamentRepositoryError) -> Self {
        match err {
            TournamentRepositoryError::NotFound(id) => {
                TournamentServiceError::NotFound(format!("tournament {} does not exist", id))
            }
            TournamentRepositoryError::AlreadyExists(_) => {
                TournamentServiceError::Conflict(err.to_string())
            }
            TournamentRepositoryError::Storage(_) => {
                TournamentServiceError::Repository(err.to_string())
            }
        }
    }
}

impl From<UserRepositoryError> for TournamentServiceError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::NotFound => TournamentServiceError::NotFound(err.to_string()),
            _ => TournamentServiceError::Repository(err.to_string()),
        }
    }
}
