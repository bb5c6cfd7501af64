use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{
    game::{Game, GameStatus, Side},
    protocol::requests::Operation,
};

/// Published after every successful mutation of a game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    pub game_id: String,
    pub operation: Operation,
    pub fen: String,
    pub status: GameStatus,
    pub side: Side,
    pub winner: Option<Side>,
}

impl GameEvent {
    pub fn new(operation: Operation, game: &Game) -> Self {
        GameEvent {
            game_id: game.id.clone(),
            operation,
            fen: game.fen.clone(),
            status: game.status,
            side: game.side,
            winner: game.winner,
        }
    }
}

pub trait GameNotifier: Send + Sync {
    fn notify(&self, event: GameEvent);
}

pub struct BroadcastNotifier {
    sender: broadcast::Sender<GameEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        BroadcastNotifier { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl GameNotifier for BroadcastNotifier {
    fn notify(&self, event: GameEvent) {
        let game_id = event.game_id.clone();
        if self.sender.send(event).is_err() {
            debug!("No subscribers for game {}", game_id);
        }
    }
}
