use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;

use crate::{
    models::chess_move::MoveInput,
    services::{chess_service::RulesProvider, errors::oracle_errors::OracleError},
};

#[cfg(test)]
use mockall::automock;

/// Source of moves for AI-backed players.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MoveOracle: Send + Sync {
    async fn suggest_move(&self, position: &str, difficulty: u8) -> Result<MoveInput, OracleError>;
}

/// Picks uniformly among the legal moves; difficulty is ignored.
pub struct RandomMoveOracle {
    rules: Arc<dyn RulesProvider>,
}

impl RandomMoveOracle {
    pub fn new(rules: Arc<dyn RulesProvider>) -> Self {
        RandomMoveOracle { rules }
    }
}

#[async_trait]
impl MoveOracle for RandomMoveOracle {
    async fn suggest_move(&self, position: &str, _difficulty: u8) -> Result<MoveInput, OracleError> {
        let moves = self.rules.legal_moves(position)?;
        moves
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(OracleError::NoMove)
    }
}
