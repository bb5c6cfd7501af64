use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{
    chess_move::MoveInput,
    game::{GameMode, Side},
    join::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Join,
    Leave,
    Move,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Join => "join",
            Operation::Leave => "leave",
            Operation::Move => "move",
        };
        f.write_str(name)
    }
}

/// The single request shape shared by every protocol operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChessRequest {
    pub operation: Operation,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub chess_move: Option<MoveInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<GameMode>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl ChessRequest {
    pub fn new(operation: Operation, client_id: &str, user_id: &str) -> Self {
        let now = Utc::now().timestamp_millis();
        ChessRequest {
            operation,
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            game_id: None,
            join_id: None,
            side: None,
            role: None,
            chess_move: None,
            mode: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn create(client_id: &str, user_id: &str, side: Side, role: Role) -> Self {
        Self::new(Operation::Create, client_id, user_id)
            .with_side(side)
            .with_role(role)
    }

    pub fn join(client_id: &str, user_id: &str, game_id: &str, side: Side, role: Role) -> Self {
        Self::new(Operation::Join, client_id, user_id)
            .with_game_id(game_id)
            .with_side(side)
            .with_role(role)
    }

    pub fn leave(client_id: &str, user_id: &str, game_id: &str, join_id: &str) -> Self {
        Self::new(Operation::Leave, client_id, user_id)
            .with_game_id(game_id)
            .with_join_id(join_id)
    }

    pub fn make_move(client_id: &str, user_id: &str, game_id: &str, chess_move: MoveInput) -> Self {
        Self::new(Operation::Move, client_id, user_id)
            .with_game_id(game_id)
            .with_move(chess_move)
    }

    pub fn with_game_id(mut self, game_id: &str) -> Self {
        self.game_id = Some(game_id.to_string());
        self
    }

    pub fn with_join_id(mut self, join_id: &str) -> Self {
        self.join_id = Some(join_id.to_string());
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_move(mut self, chess_move: MoveInput) -> Self {
        self.chess_move = Some(chess_move);
        self
    }
}
