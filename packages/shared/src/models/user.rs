use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    Human,
    Ai,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub kind: UserKind,
    /// Oracle difficulty for AI-backed users.
    pub difficulty: Option<u8>,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            name,
            kind: UserKind::Human,
            difficulty: None,
            rating: 1200, // Default starting rating for chess platform
            created_at: Utc::now(),
        }
    }

    pub fn new_ai(name: String, difficulty: u8) -> Self {
        User {
            kind: UserKind::Ai,
            difficulty: Some(difficulty),
            ..User::new(name)
        }
    }

    pub fn is_ai(&self) -> bool {
        self.kind == UserKind::Ai
    }
}
