use crate::models::tournament::{Participant, Score, Tournament, TournamentGame};
use crate::repositories::errors::tournament_repository_errors::TournamentRepositoryError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[cfg(test)]
use mockall::automock;

/// Records changed by one tournament step (start, result, next round),
/// applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TournamentWrite {
    pub tournament: Option<Tournament>,
    pub participants: Vec<Participant>,
    pub games: Vec<TournamentGame>,
    pub scores: Option<Vec<Score>>,
}

impl TournamentWrite {
    pub fn new(tournament: Tournament) -> Self {
        TournamentWrite {
            tournament: Some(tournament),
            ..TournamentWrite::default()
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    async fn create_tournament(&self, tournament: &Tournament)
        -> Result<(), TournamentRepositoryError>;

    async fn get_tournament(
        &self,
        tournament_id: &str,
    ) -> Result<Option<Tournament>, TournamentRepositoryError>;

    async fn add_participant(
        &self,
        participant: &Participant,
    ) -> Result<(), TournamentRepositoryError>;

    /// Participants ordered by seed.
    async fn get_participants(
        &self,
        tournament_id: &str,
    ) -> Result<Vec<Participant>, TournamentRepositoryError>;

    /// Tournament games ordered by round, then slot, then creation.
    async fn get_tournament_games(
        &self,
        tournament_id: &str,
    ) -> Result<Vec<TournamentGame>, TournamentRepositoryError>;

    async fn find_tournament_game(
        &self,
        game_id: &str,
    ) -> Result<Option<TournamentGame>, TournamentRepositoryError>;

    /// Tournament games of every tournament that have no recorded result.
    async fn get_open_tournament_games(&self)
        -> Result<Vec<TournamentGame>, TournamentRepositoryError>;

    async fn get_scores(&self, tournament_id: &str)
        -> Result<Vec<Score>, TournamentRepositoryError>;

    async fn commit(&self, write: TournamentWrite) -> Result<(), TournamentRepositoryError>;
}

#[derive(Default)]
struct TournamentTables {
    tournaments: HashMap<String, Tournament>,
    participants: HashMap<String, Vec<Participant>>,
    games: HashMap<String, Vec<TournamentGame>>,
    game_index: HashMap<String, String>,
    scores: HashMap<String, Vec<Score>>,
}

impl TournamentTables {
    fn upsert_participant(&mut self, participant: Participant) {
        let participants = self
            .participants
            .entry(participant.tournament_id.clone())
            .or_default();
        match participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => participants.push(participant),
        }
    }

    fn upsert_game(&mut self, game: TournamentGame) {
        self.game_index
            .insert(game.game_id.clone(), game.tournament_id.clone());
        let games = self.games.entry(game.tournament_id.clone()).or_default();
        match games.iter_mut().find(|g| g.id == game.id) {
            Some(existing) => *existing = game,
            None => games.push(game),
        }
    }
}

#[derive(Default)]
pub struct InMemoryTournamentRepository {
    tables: RwLock<TournamentTables>,
}

impl InMemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for InMemoryTournamentRepository {
    async fn create_tournament(
        &self,
        tournament: &Tournament,
    ) -> Result<(), TournamentRepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.tournaments.contains_key(&tournament.id) {
            return Err(TournamentRepositoryError::AlreadyExists(tournament.id.clone()));
        }
        tables
            .tournaments
            .insert(tournament.id.clone(), tournament.clone());
        Ok(())
    }

    async fn get_tournament(
        &self,
        tournament_id: &str,
    ) -> Result<Option<Tournament>, TournamentRepositoryError> {
        Ok(self.tables.read().await.tournaments.get(tournament_id).cloned())
    }

    async fn add_participant(
        &self,
        participant: &Participant,
    ) -> Result<(), TournamentRepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.tournaments.contains_key(&participant.tournament_id) {
            return Err(TournamentRepositoryError::NotFound(
                participant.tournament_id.clone(),
            ));
        }
        tables.upsert_participant(participant.clone());
        Ok(())
    }

    async fn get_participants(
        &self,
        tournament_id: &str,
    ) -> Result<Vec<Participant>, TournamentRepositoryError> {
        let mut participants = self
            .tables
            .read()
            .await
            .participants
            .get(tournament_id)
            .cloned()
            .unwrap_or_default();
        participants.sort_by_key(|participant| participant.seed);
        Ok(participants)
    }

    async fn get_tournament_games(
        &self,
        tournament_id: &str,
    ) -> Result<Vec<TournamentGame>, TournamentRepositoryError> {
        let mut games = self
            .tables
            .read()
            .await
            .games
            .get(tournament_id)
            .cloned()
            .unwrap_or_default();
        games.sort_by(|a, b| {
            (a.round, a.slot, a.created_at).cmp(&(b.round, b.slot, b.created_at))
        });
        Ok(games)
    }

    async fn find_tournament_game(
        &self,
        game_id: &str,
    ) -> Result<Option<TournamentGame>, TournamentRepositoryError> {
        let tables = self.tables.read().await;
        let game = tables.game_index.get(game_id).and_then(|tournament_id| {
            tables
                .games
                .get(tournament_id)
                .and_then(|games| games.iter().find(|game| game.game_id == game_id))
        });
        Ok(game.cloned())
    }

    async fn get_open_tournament_games(
        &self,
    ) -> Result<Vec<TournamentGame>, TournamentRepositoryError> {
        let tables = self.tables.read().await;
        let mut games: Vec<TournamentGame> = tables
            .games
            .values()
            .flatten()
            .filter(|game| !game.is_complete())
            .cloned()
            .collect();
        games.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(games)
    }

    async fn get_scores(
        &self,
        tournament_id: &str,
    ) -> Result<Vec<Score>, TournamentRepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .scores
            .get(tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit(&self, write: TournamentWrite) -> Result<(), TournamentRepositoryError> {
        let mut tables = self.tables.write().await;

        if let Some(tournament) = &write.tournament {
            if !tables.tournaments.contains_key(&tournament.id) {
                return Err(TournamentRepositoryError::NotFound(tournament.id.clone()));
            }
        }
        let unknown = write
            .participants
            .iter()
            .map(|participant| &participant.tournament_id)
            .chain(write.games.iter().map(|game| &game.tournament_id))
            .find(|tournament_id| !tables.tournaments.contains_key(*tournament_id));
        if let Some(tournament_id) = unknown {
            return Err(TournamentRepositoryError::NotFound(tournament_id.clone()));
        }

        if let Some(tournament) = write.tournament {
            tables
                .tournaments
                .insert(tournament.id.clone(), tournament);
        }
        for participant in write.participants {
            tables.upsert_participant(participant);
        }
        for game in write.games {
            tables.upsert_game(game);
        }
        if let Some(scores) = write.scores {
            if let Some(first) = scores.first() {
                let tournament_id = first.tournament_id.clone();
                tables.scores.insert(tournament_id, scores);
            }
        }

        Ok(())
    }
}
