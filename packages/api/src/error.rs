use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::services::errors::{
    game_session_service_errors::GameSessionServiceError,
    tournament_service_errors::TournamentServiceError,
};

#[derive(Debug)]
pub enum ApiError {
    GameSessionService(GameSessionServiceError),
    TournamentService(TournamentServiceError),
}

impl From<GameSessionServiceError> for ApiError {
    fn from(error: GameSessionServiceError) -> Self {
        ApiError::GameSessionService(error)
    }
}

impl From<TournamentServiceError> for ApiError {
    fn from(error: TournamentServiceError) -> Self {
        ApiError::TournamentService(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::GameSessionService(GameSessionServiceError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::GameSessionService(GameSessionServiceError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::GameSessionService(
                GameSessionServiceError::Conflict(_) | GameSessionServiceError::Turn(_),
            ) => StatusCode::CONFLICT,
            ApiError::GameSessionService(
                GameSessionServiceError::IllegalMove(_) | GameSessionServiceError::State(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::GameSessionService(GameSessionServiceError::Internal(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            ApiError::TournamentService(TournamentServiceError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::TournamentService(TournamentServiceError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::TournamentService(TournamentServiceError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::TournamentService(TournamentServiceError::State(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::TournamentService(
                TournamentServiceError::GameSession(_) | TournamentServiceError::Repository(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::GameSessionService(e) => write!(f, "{}", e),
            ApiError::TournamentService(e) => write!(f, "{}", e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
