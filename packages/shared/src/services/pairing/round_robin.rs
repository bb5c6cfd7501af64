use crate::{
    models::tournament::{Participant, TournamentGame},
    services::{
        errors::tournament_service_errors::TournamentServiceError,
        pairing::{require_players, Pairing, PairingStrategy},
    },
};

/// Everyone plays everyone once, scheduled with the circle method.
pub struct RoundRobin;

/// Index pairs `(white, black)` for every round of an `n` player
/// round robin. With an odd `n` a phantom seat is added and whoever meets
/// it sits the round out.
pub fn schedule(n: usize) -> Vec<Vec<(usize, usize)>> {
    if n < 2 {
        return Vec::new();
    }
    let seats = n + n % 2;
    let rotating = seats - 1;

    (0..rotating)
        .map(|round| {
            let order: Vec<usize> = std::iter::once(0)
                .chain((0..rotating).map(|k| 1 + (k + round) % rotating))
                .collect();

            (0..seats / 2)
                .filter_map(|i| {
                    let (a, b) = (order[i], order[seats - 1 - i]);
                    if a >= n || b >= n {
                        return None;
                    }
                    // alternate colours so nobody keeps white
                    if (round + i) % 2 == 0 {
                        Some((a, b))
                    } else {
                        Some((b, a))
                    }
                })
                .collect()
        })
        .collect()
}

impl PairingStrategy for RoundRobin {
    fn total_rounds(&self, players: &[Participant]) -> Result<u32, TournamentServiceError> {
        require_players(players, 2)?;
        Ok(schedule(players.len()).len() as u32)
    }

    fn pair_round(
        &self,
        round: u32,
        players: &[Participant],
        _games: &[TournamentGame],
    ) -> Result<Vec<Pairing>, TournamentServiceError> {
        require_players(players, 2)?;
        let rounds = schedule(players.len());
        let pairs = round
            .checked_sub(1)
            .and_then(|index| rounds.get(index as usize))
            .ok_or_else(|| TournamentServiceError::State(format!("round {} is out of range", round)))?;

        Ok(pairs
            .iter()
            .enumerate()
            .map(|(slot, &(white, black))| {
                Pairing::new(round, slot as u32, &players[white], &players[black])
            })
            .collect())
    }
}
