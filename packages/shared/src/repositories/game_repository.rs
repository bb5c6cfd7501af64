use crate::models::{chess_move::Move, game::Game, join::Join};
use crate::repositories::errors::game_repository_errors::GameRepositoryError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[cfg(test)]
use mockall::automock;

/// Every record touched by one protocol operation. Repositories apply a
/// write all-or-nothing so readers never observe a half-applied move.
#[derive(Debug, Clone, PartialEq)]
pub struct GameWrite {
    pub game: Game,
    pub joins: Vec<Join>,
    pub new_move: Option<Move>,
}

impl GameWrite {
    pub fn new(game: Game) -> Self {
        GameWrite {
            game,
            joins: Vec::new(),
            new_move: None,
        }
    }

    pub fn with_join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn with_move(mut self, new_move: Move) -> Self {
        self.new_move = Some(new_move);
        self
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError>;

    async fn get_join(&self, join_id: &str) -> Result<Option<Join>, GameRepositoryError>;

    async fn get_joins(&self, game_id: &str) -> Result<Vec<Join>, GameRepositoryError>;

    async fn get_moves(&self, game_id: &str) -> Result<Vec<Move>, GameRepositoryError>;

    async fn commit(&self, write: GameWrite) -> Result<(), GameRepositoryError>;
}

#[derive(Default)]
struct GameTables {
    games: HashMap<String, Game>,
    joins: HashMap<String, Vec<Join>>,
    join_index: HashMap<String, String>,
    moves: HashMap<String, Vec<Move>>,
}

#[derive(Default)]
pub struct InMemoryGameRepository {
    tables: RwLock<GameTables>,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn get_game(&self, game_id: &str) -> Result<Option<Game>, GameRepositoryError> {
        Ok(self.tables.read().await.games.get(game_id).cloned())
    }

    async fn get_join(&self, join_id: &str) -> Result<Option<Join>, GameRepositoryError> {
        let tables = self.tables.read().await;
        let join = tables.join_index.get(join_id).and_then(|game_id| {
            tables
                .joins
                .get(game_id)
                .and_then(|joins| joins.iter().find(|join| join.id == join_id))
        });
        Ok(join.cloned())
    }

    async fn get_joins(&self, game_id: &str) -> Result<Vec<Join>, GameRepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .joins
            .get(game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_moves(&self, game_id: &str) -> Result<Vec<Move>, GameRepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .moves
            .get(game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit(&self, write: GameWrite) -> Result<(), GameRepositoryError> {
        let mut tables = self.tables.write().await;
        let game_id = write.game.id.clone();

        // checked before anything is written
        if let Some(new_move) = &write.new_move {
            let recorded = tables.moves.get(&game_id).map_or(0, Vec::len) as u32;
            if new_move.sequence != recorded + 1 {
                return Err(GameRepositoryError::SequenceConflict {
                    expected: recorded + 1,
                    actual: new_move.sequence,
                });
            }
        }
        if let Some(join) = write.joins.iter().find(|join| join.game_id != game_id) {
            return Err(GameRepositoryError::Storage(format!(
                "join {} belongs to game {}, not {}",
                join.id, join.game_id, game_id
            )));
        }

        for join in write.joins {
            tables.join_index.insert(join.id.clone(), game_id.clone());
            let joins = tables.joins.entry(game_id.clone()).or_default();
            match joins.iter_mut().find(|existing| existing.id == join.id) {
                Some(existing) => *existing = join,
                None => joins.push(join),
            }
        }
        if let Some(new_move) = write.new_move {
            tables.moves.entry(game_id.clone()).or_default().push(new_move);
        }
        tables.games.insert(game_id, write.game);

        Ok(())
    }
}
