use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::game::{GameStatus, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentType {
    #[serde(rename = "round-robin")]
    RoundRobin,
    #[serde(rename = "knockout")]
    Knockout,
    #[serde(rename = "scheveningen")]
    Scheveningen,
}

impl fmt::Display for TournamentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TournamentType::RoundRobin => "round-robin",
            TournamentType::Knockout => "knockout",
            TournamentType::Scheveningen => "scheveningen",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Await,
    Ready,
    Continue,
    Finished,
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TournamentStatus::Await => "await",
            TournamentStatus::Ready => "ready",
            TournamentStatus::Continue => "continue",
            TournamentStatus::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: String,
    #[serde(rename = "type")]
    pub tournament_type: TournamentType,
    pub status: TournamentStatus,
    pub organizer_id: String,
    /// Zero until the tournament starts.
    pub current_round: u32,
    pub winner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    pub fn new(organizer_id: &str, tournament_type: TournamentType) -> Self {
        let now = Utc::now();
        Tournament {
            id: Uuid::new_v4().to_string(),
            tournament_type,
            status: TournamentStatus::Await,
            organizer_id: organizer_id.to_string(),
            current_round: 0,
            winner_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Result of a finished game from the tournament's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    WhiteWin,
    BlackWin,
    Draw,
    /// Cancelled before it started; counts for nobody.
    Void,
}

impl GameOutcome {
    /// `None` while the game is still in progress.
    pub fn from_status(status: GameStatus, winner: Option<Side>) -> Option<GameOutcome> {
        let outcome = match status {
            GameStatus::Await | GameStatus::Ready | GameStatus::Continue => return None,
            GameStatus::Checkmate => match winner {
                Some(Side::White) => GameOutcome::WhiteWin,
                Some(Side::Black) => GameOutcome::BlackWin,
                _ => GameOutcome::Void,
            },
            GameStatus::WhiteSurrender => GameOutcome::BlackWin,
            GameStatus::BlackSurrender => GameOutcome::WhiteWin,
            GameStatus::Stalemate | GameStatus::Draw => GameOutcome::Draw,
            GameStatus::Cancelled => GameOutcome::Void,
        };
        Some(outcome)
    }

    pub fn is_decisive(self) -> bool {
        matches!(self, GameOutcome::WhiteWin | GameOutcome::BlackWin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Player,
    Organizer,
    Observer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub tournament_id: String,
    pub user_id: String,
    pub role: ParticipantRole,
    pub team: Option<Team>,
    /// Registration order; doubles as the knockout seed.
    pub seed: u32,
    pub eliminated: bool,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(tournament_id: &str, user_id: &str, role: ParticipantRole, seed: u32) -> Self {
        Participant {
            id: Uuid::new_v4().to_string(),
            tournament_id: tournament_id.to_string(),
            user_id: user_id.to_string(),
            role,
            team: None,
            seed,
            eliminated: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_player(&self) -> bool {
        self.role == ParticipantRole::Player
    }
}

/// Links a game to the tournament round and slot that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentGame {
    pub id: String,
    pub tournament_id: String,
    pub game_id: String,
    pub round: u32,
    pub slot: u32,
    pub white_participant_id: String,
    pub black_participant_id: String,
    /// Terminal status of the game once its result has been recorded.
    pub result: Option<GameStatus>,
    pub outcome: Option<GameOutcome>,
    pub created_at: DateTime<Utc>,
}

impl TournamentGame {
    pub fn new(
        tournament_id: &str,
        game_id: &str,
        round: u32,
        slot: u32,
        white_participant_id: &str,
        black_participant_id: &str,
    ) -> Self {
        TournamentGame {
            id: Uuid::new_v4().to_string(),
            tournament_id: tournament_id.to_string(),
            game_id: game_id.to_string(),
            round,
            slot,
            white_participant_id: white_participant_id.to_string(),
            black_participant_id: black_participant_id.to_string(),
            result: None,
            outcome: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn winner(&self) -> Option<&str> {
        match self.outcome? {
            GameOutcome::WhiteWin => Some(&self.white_participant_id),
            GameOutcome::BlackWin => Some(&self.black_participant_id),
            _ => None,
        }
    }

    pub fn loser(&self) -> Option<&str> {
        match self.outcome? {
            GameOutcome::WhiteWin => Some(&self.black_participant_id),
            GameOutcome::BlackWin => Some(&self.white_participant_id),
            _ => None,
        }
    }

    pub fn involves(&self, participant_id: &str) -> bool {
        self.white_participant_id == participant_id || self.black_participant_id == participant_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub tournament_id: String,
    pub participant_id: String,
    pub user_id: String,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub points: f64,
}

impl Score {
    pub fn new(participant: &Participant) -> Self {
        Score {
            tournament_id: participant.tournament_id.clone(),
            participant_id: participant.id.clone(),
            user_id: participant.user_id.clone(),
            wins: 0,
            draws: 0,
            losses: 0,
            points: 0.0,
        }
    }
}
