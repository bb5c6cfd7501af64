use crate::{
    models::tournament::{Participant, TournamentGame},
    services::{
        errors::tournament_service_errors::TournamentServiceError,
        pairing::{latest_by_slot, require_players, Pairing, PairingStrategy},
    },
};

/// Single elimination. Top seeds get byes so the second round holds a power
/// of two; every later round folds the field, first against last.
pub struct Knockout;

fn bracket_size(players: usize) -> usize {
    players.next_power_of_two()
}

/// Seeds that skip the first round.
pub fn byes(players: usize) -> usize {
    bracket_size(players) - players
}

/// Pairs `entrants[i]` with `entrants[len - 1 - i]`.
fn fold(round: u32, entrants: &[&Participant]) -> Vec<Pairing> {
    let half = entrants.len() / 2;
    (0..half)
        .map(|i| Pairing::new(round, i as u32, entrants[i], entrants[entrants.len() - 1 - i]))
        .collect()
}

fn winners_of<'a>(
    round: u32,
    players: &'a [Participant],
    games: &[TournamentGame],
) -> Result<Vec<&'a Participant>, TournamentServiceError> {
    latest_by_slot(round, games)
        .values()
        .map(|game| {
            let winner = game.winner().ok_or_else(|| {
                TournamentServiceError::State(format!(
                    "round {} slot {} has no winner yet",
                    round, game.slot
                ))
            })?;
            players
                .iter()
                .find(|p| p.id == winner)
                .ok_or_else(|| TournamentServiceError::NotFound(format!("participant {}", winner)))
        })
        .collect()
}

impl PairingStrategy for Knockout {
    fn total_rounds(&self, players: &[Participant]) -> Result<u32, TournamentServiceError> {
        require_players(players, 2)?;
        Ok(bracket_size(players.len()).trailing_zeros())
    }

    fn pair_round(
        &self,
        round: u32,
        players: &[Participant],
        games: &[TournamentGame],
    ) -> Result<Vec<Pairing>, TournamentServiceError> {
        let total = self.total_rounds(players)?;
        if round == 0 || round > total {
            return Err(TournamentServiceError::State(format!("round {} is out of range", round)));
        }

        let seeded: Vec<&Participant> = players.iter().collect();
        let bye_count = byes(players.len());

        let entrants = match round {
            1 => seeded[bye_count..].to_vec(),
            2 => {
                let mut entrants = seeded[..bye_count].to_vec();
                entrants.extend(winners_of(1, players, games)?);
                entrants
            }
            _ => winners_of(round - 1, players, games)?,
        };

        Ok(fold(round, &entrants))
    }

    fn replays_undecided(&self) -> bool {
        true
    }
}
