use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Which of the two players a join or move belongs to. `None` is used for
/// spectators, who never hold a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    None,
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
            Side::None => Side::None,
        }
    }

    pub fn is_player_side(self) -> bool {
        matches!(self, Side::White | Side::Black)
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> Self {
        match side {
            Side::None => 0,
            Side::White => 1,
            Side::Black => 2,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Side::None),
            1 => Ok(Side::White),
            2 => Ok(Side::Black),
            other => Err(format!("side must be 0, 1 or 2, got {}", other)),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Await,
    Ready,
    Continue,
    Checkmate,
    Stalemate,
    Draw,
    WhiteSurrender,
    BlackSurrender,
    Cancelled,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            GameStatus::Await | GameStatus::Ready | GameStatus::Continue
        )
    }

    /// Statuses in which a move may be appended.
    pub fn accepts_moves(self) -> bool {
        matches!(self, GameStatus::Ready | GameStatus::Continue)
    }

    /// Position in the forward-only lifecycle; every terminal status shares the last rank.
    pub fn rank(self) -> u8 {
        match self {
            GameStatus::Await => 0,
            GameStatus::Ready => 1,
            GameStatus::Continue => 2,
            _ => 3,
        }
    }

    /// The surrender status for the side that gave up.
    pub fn surrender_of(side: Side) -> Option<GameStatus> {
        match side {
            Side::White => Some(GameStatus::WhiteSurrender),
            Side::Black => Some(GameStatus::BlackSurrender),
            Side::None => None,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameStatus::Await => "await",
            GameStatus::Ready => "ready",
            GameStatus::Continue => "continue",
            GameStatus::Checkmate => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::Draw => "draw",
            GameStatus::WhiteSurrender => "white_surrender",
            GameStatus::BlackSurrender => "black_surrender",
            GameStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Classic,
    Free,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub fen: String,
    pub status: GameStatus,
    /// Whose turn it is.
    pub side: Side,
    pub mode: GameMode,
    pub winner: Option<Side>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    pub fn new(fen: &str, mode: GameMode) -> Self {
        let now = Utc::now();
        Game {
            id: Uuid::new_v4().to_string(),
            fen: fen.to_string(),
            status: GameStatus::Await,
            side: Side::White,
            mode,
            winner: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
