use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::tournament::{GameOutcome, Participant, Score, TournamentGame};

pub const WIN_POINTS: f64 = 1.0;
pub const DRAW_POINTS: f64 = 0.5;
pub const LOSS_POINTS: f64 = 0.0;

/// Score rows for `players`, rebuilt from every recorded game. Void games
/// count for nobody.
pub fn compute_scores(players: &[Participant], games: &[TournamentGame]) -> Vec<Score> {
    let mut scores: Vec<Score> = players.iter().map(Score::new).collect();
    let index: HashMap<String, usize> = scores
        .iter()
        .enumerate()
        .map(|(i, score)| (score.participant_id.clone(), i))
        .collect();

    let mut apply = |participant_id: &str, points: f64| {
        if let Some(&i) = index.get(participant_id) {
            let score = &mut scores[i];
            if points == WIN_POINTS {
                score.wins += 1;
            } else if points == DRAW_POINTS {
                score.draws += 1;
            } else {
                score.losses += 1;
            }
            score.points += points;
        }
    };

    for game in games {
        let (white, black) = match game.outcome {
            Some(GameOutcome::WhiteWin) => (WIN_POINTS, LOSS_POINTS),
            Some(GameOutcome::BlackWin) => (LOSS_POINTS, WIN_POINTS),
            Some(GameOutcome::Draw) => (DRAW_POINTS, DRAW_POINTS),
            Some(GameOutcome::Void) | None => continue,
        };
        apply(&game.white_participant_id, white);
        apply(&game.black_participant_id, black);
    }

    scores
}

/// Scores ordered by points, best first; ties keep their input order.
pub fn standings(scores: &[Score]) -> Vec<Score> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.points.partial_cmp(&a.points).unwrap_or(Ordering::Equal));
    sorted
}

/// The single best score, or `None` when the top is shared.
pub fn leader(scores: &[Score]) -> Option<&Score> {
    let best = scores
        .iter()
        .max_by(|a, b| a.points.partial_cmp(&b.points).unwrap_or(Ordering::Equal))?;
    let tied = scores.iter().filter(|s| s.points == best.points).count();
    (tied == 1).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pairing::test_support::players;

    fn finished(white: &str, black: &str, outcome: GameOutcome) -> TournamentGame {
        let mut game = TournamentGame::new("t", "g", 1, 0, white, black);
        game.outcome = Some(outcome);
        game
    }

    #[test]
    fn test_points_per_outcome() {
        let roster = players(3);
        let games = vec![
            finished("p0", "p1", GameOutcome::WhiteWin),
            finished("p1", "p2", GameOutcome::Draw),
            finished("p2", "p0", GameOutcome::BlackWin),
        ];

        let scores = compute_scores(&roster, &games);

        assert_eq!(scores[0].points, 2.0);
        assert_eq!(scores[0].wins, 2);
        assert_eq!(scores[1].points, 0.5);
        assert_eq!((scores[1].losses, scores[1].draws), (1, 1));
        assert_eq!(scores[2].points, 0.5);
    }

    #[test]
    fn test_unfinished_and_void_games_do_not_count() {
        let roster = players(2);
        let games = vec![
            TournamentGame::new("t", "g1", 1, 0, "p0", "p1"),
            finished("p0", "p1", GameOutcome::Void),
        ];

        let scores = compute_scores(&roster, &games);

        assert!(scores.iter().all(|s| s.points == 0.0 && s.wins + s.draws + s.losses == 0));
    }

    #[test]
    fn test_leader_requires_clear_first_place() {
        let roster = players(3);
        let games = vec![finished("p0", "p1", GameOutcome::Draw)];
        let scores = compute_scores(&roster, &games);
        assert!(leader(&scores).is_none());

        let games = vec![finished("p0", "p1", GameOutcome::BlackWin)];
        let scores = compute_scores(&roster, &games);
        assert_eq!(leader(&scores).map(|s| s.participant_id.as_str()), Some("p1"));
        assert_eq!(standings(&scores)[0].participant_id, "p1");
    }
}
