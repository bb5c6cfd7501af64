use crate::{
    models::tournament::{Participant, Team, TournamentGame},
    services::{
        errors::tournament_service_errors::TournamentServiceError,
        pairing::{require_players, Pairing, PairingStrategy},
    },
};

/// Team match: every member of team A plays every member of team B once.
pub struct Scheveningen;

/// Splits the roster into teams. Explicit team assignments are used when
/// every player has one; with none assigned, the first half by seed forms
/// team A.
pub fn teams(players: &[Participant]) -> Result<(Vec<&Participant>, Vec<&Participant>), TournamentServiceError> {
    let assigned = players.iter().filter(|p| p.team.is_some()).count();

    let (team_a, team_b): (Vec<&Participant>, Vec<&Participant>) = if assigned == 0 {
        let split = players.len() / 2;
        (players[..split].iter().collect(), players[split..].iter().collect())
    } else if assigned == players.len() {
        players.iter().partition(|p| p.team == Some(Team::A))
    } else {
        return Err(TournamentServiceError::Validation(
            "assign a team to every player or to none".to_string(),
        ));
    };

    if team_a.is_empty() || team_b.is_empty() {
        return Err(TournamentServiceError::State(
            "both teams need at least one player".to_string(),
        ));
    }
    Ok((team_a, team_b))
}

/// `(a, b)` index pairs for every round between teams of `a_len` and
/// `b_len`. Member `i` of the smaller team meets member `(i + round) % n`
/// of the larger one, so surplus members of the larger team sit out some
/// rounds.
pub fn schedule(a_len: usize, b_len: usize) -> Vec<Vec<(usize, usize)>> {
    let rounds = a_len.max(b_len);
    (0..rounds)
        .map(|round| {
            if a_len <= b_len {
                (0..a_len).map(|i| (i, (i + round) % b_len)).collect()
            } else {
                (0..b_len).map(|j| ((j + round) % a_len, j)).collect()
            }
        })
        .collect()
}

impl PairingStrategy for Scheveningen {
    fn total_rounds(&self, players: &[Participant]) -> Result<u32, TournamentServiceError> {
        require_players(players, 2)?;
        let (team_a, team_b) = teams(players)?;
        Ok(team_a.len().max(team_b.len()) as u32)
    }

    fn pair_round(
        &self,
        round: u32,
        players: &[Participant],
        _games: &[TournamentGame],
    ) -> Result<Vec<Pairing>, TournamentServiceError> {
        require_players(players, 2)?;
        let (team_a, team_b) = teams(players)?;
        let rounds = schedule(team_a.len(), team_b.len());
        let pairs = round
            .checked_sub(1)
            .and_then(|index| rounds.get(index as usize))
            .ok_or_else(|| TournamentServiceError::State(format!("round {} is out of range", round)))?;

        Ok(pairs
            .iter()
            .enumerate()
            .map(|(slot, &(a, b))| {
                // team A has white in odd rounds
                if (round as usize + slot) % 2 == 1 {
                    Pairing::new(round, slot as u32, team_a[a], team_b[b])
                } else {
                    Pairing::new(round, slot as u32, team_b[b], team_a[a])
                }
            })
            .collect())
    }
}
