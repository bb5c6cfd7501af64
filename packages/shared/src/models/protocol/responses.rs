use serde::{Deserialize, Serialize};

use crate::models::game::{Game, GameStatus, Side};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
}

impl ResponseData {
    pub fn from_game(game: &Game) -> Self {
        ResponseData {
            game_id: Some(game.id.clone()),
            join_id: None,
            fen: Some(game.fen.clone()),
            status: Some(game.status),
            side: Some(game.side),
        }
    }

    pub fn with_join_id(mut self, join_id: &str) -> Self {
        self.join_id = Some(join_id.to_string());
        self
    }
}

/// Business failures travel in `error`; the response itself is always a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChessResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChessResponse {
    pub fn ok(data: ResponseData) -> Self {
        ChessResponse {
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl ToString) -> Self {
        ChessResponse {
            data: None,
            error: Some(message.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The error kind prefix, e.g. `ConflictError` for `ConflictError: side 1 is already taken`.
    pub fn error_kind(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(|error| error.split(':').next().unwrap_or(error).trim())
    }

    pub fn status(&self) -> Option<GameStatus> {
        self.data.as_ref().and_then(|data| data.status)
    }

    pub fn side(&self) -> Option<Side> {
        self.data.as_ref().and_then(|data| data.side)
    }

    pub fn game_id(&self) -> Option<&str> {
        self.data.as_ref().and_then(|data| data.game_id.as_deref())
    }

    pub fn join_id(&self) -> Option<&str> {
        self.data.as_ref().and_then(|data| data.join_id.as_deref())
    }

    pub fn fen(&self) -> Option<&str> {
        self.data.as_ref().and_then(|data| data.fen.as_deref())
    }
}
