use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::game::Side;

/// A move as submitted by a client or suggested by an oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveInput {
    pub from: String, // e.g., "e2"
    pub to: String,   // e.g., "e4"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>, // e.g., "q" for queen
}

impl MoveInput {
    pub fn new(from: &str, to: &str) -> Self {
        MoveInput {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }

    pub fn with_promotion(from: &str, to: &str, promotion: &str) -> Self {
        MoveInput {
            from: from.to_string(),
            to: to.to_string(),
            promotion: Some(promotion.to_string()),
        }
    }
}

impl fmt::Display for MoveInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)?;
        if let Some(promotion) = &self.promotion {
            write!(f, "={}", promotion)?;
        }
        Ok(())
    }
}

/// A recorded move. `fen_before` is the position the move was played from,
/// so a game can be replayed from its move list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub id: String,
    pub game_id: String,
    pub user_id: String,
    pub side: Side,
    pub sequence: u32,
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    pub fen_before: String,
    pub created_at: DateTime<Utc>,
}

impl Move {
    pub fn new(
        game_id: &str,
        user_id: &str,
        side: Side,
        sequence: u32,
        input: &MoveInput,
        fen_before: &str,
    ) -> Self {
        Move {
            id: Uuid::new_v4().to_string(),
            game_id: game_id.to_string(),
            user_id: user_id.to_string(),
            side,
            sequence,
            from: input.from.clone(),
            to: input.to.clone(),
            promotion: input.promotion.clone(),
            fen_before: fen_before.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn input(&self) -> MoveInput {
        MoveInput {
            from: self.from.clone(),
            to: self.to.clone(),
            promotion: self.promotion.clone(),
        }
    }
}
