use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::game::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    Player,
    Spectator,
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        match role {
            Role::Player => 0,
            Role::Spectator => 1,
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Role::Player),
            1 => Ok(Role::Spectator),
            other => Err(format!("role must be 0 or 1, got {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Active,
    Left,
}

/// A connected client's participation in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Join {
    pub id: String,
    pub game_id: String,
    pub user_id: String,
    pub client_id: String,
    pub side: Side,
    pub role: Role,
    pub status: JoinStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Join {
    pub fn new(game_id: &str, user_id: &str, client_id: &str, side: Side, role: Role) -> Self {
        let now = Utc::now();
        // spectators never hold a side
        let side = match role {
            Role::Player => side,
            Role::Spectator => Side::None,
        };
        Join {
            id: Uuid::new_v4().to_string(),
            game_id: game_id.to_string(),
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            side,
            role,
            status: JoinStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active_player(&self) -> bool {
        self.role == Role::Player && self.status == JoinStatus::Active
    }

    pub fn holds(&self, side: Side) -> bool {
        self.is_active_player() && self.side == side
    }

    pub fn leave(&mut self) {
        self.status = JoinStatus::Left;
        self.updated_at = Utc::now();
    }
}
