pub mod knockout;
pub mod round_robin;
pub mod scheveningen;

use std::collections::BTreeMap;

use crate::{
    models::tournament::{Participant, TournamentGame, TournamentType},
    services::errors::tournament_service_errors::TournamentServiceError,
};

pub use knockout::Knockout;
pub use round_robin::RoundRobin;
pub use scheveningen::Scheveningen;

/// One game to create: participant ids for each colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub round: u32,
    pub slot: u32,
    pub white: String,
    pub black: String,
}

impl Pairing {
    pub fn new(round: u32, slot: u32, white: &Participant, black: &Participant) -> Self {
        Pairing {
            round,
            slot,
            white: white.id.clone(),
            black: black.id.clone(),
        }
    }

    /// Same round and slot with colours swapped.
    pub fn from_replay(game: &TournamentGame) -> Self {
        Pairing {
            round: game.round,
            slot: game.slot,
            white: game.black_participant_id.clone(),
            black: game.white_participant_id.clone(),
        }
    }
}

/// Decides who plays whom. `players` are the tournament's player
/// participants in seed order; rounds are numbered from 1.
pub trait PairingStrategy: Send + Sync {
    fn total_rounds(&self, players: &[Participant]) -> Result<u32, TournamentServiceError>;

    fn pair_round(
        &self,
        round: u32,
        players: &[Participant],
        games: &[TournamentGame],
    ) -> Result<Vec<Pairing>, TournamentServiceError>;

    /// Whether drawn or cancelled games are replayed until someone wins.
    fn replays_undecided(&self) -> bool {
        false
    }
}

pub fn strategy_for(tournament_type: TournamentType) -> Box<dyn PairingStrategy> {
    match tournament_type {
        TournamentType::RoundRobin => Box::new(RoundRobin),
        TournamentType::Knockout => Box::new(Knockout),
        TournamentType::Scheveningen => Box::new(Scheveningen),
    }
}

/// The game currently standing for each slot of `round`, i.e. the most
/// recent one when a slot was replayed.
pub fn latest_by_slot(round: u32, games: &[TournamentGame]) -> BTreeMap<u32, &TournamentGame> {
    let mut latest: BTreeMap<u32, &TournamentGame> = BTreeMap::new();
    for game in games.iter().filter(|g| g.round == round) {
        match latest.get(&game.slot) {
            Some(current) if current.created_at > game.created_at => {}
            _ => {
                latest.insert(game.slot, game);
            }
        }
    }
    latest
}

/// A round is over once every slot's standing game has a result, and that
/// result is decisive when the strategy replays undecided games.
pub fn round_complete(strategy: &dyn PairingStrategy, round: u32, games: &[TournamentGame]) -> bool {
    let latest = latest_by_slot(round, games);
    !latest.is_empty()
        && latest.values().all(|game| match game.outcome {
            Some(outcome) => outcome.is_decisive() || !strategy.replays_undecided(),
            None => false,
        })
}

fn require_players(players: &[Participant], minimum: usize) -> Result<(), TournamentServiceError> {
    if players.len() < minimum {
        return Err(TournamentServiceError::State(format!(
            "at least {} players are needed, found {}",
            minimum,
            players.len()
        )));
    }
    Ok(())
}
