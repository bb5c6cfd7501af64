use async_trait::async_trait;

use crate::{
    models::{
        game::Game,
        protocol::{
            requests::{ChessRequest, Operation},
            responses::ChessResponse,
        },
    },
    services::errors::game_session_service_errors::GameSessionServiceError,
};

/// The authoritative side of the session protocol. Every operation answers
/// with a response value; failures are carried in `error`.
#[async_trait]
pub trait ChessServer: Send + Sync {
    async fn create(&self, request: ChessRequest) -> ChessResponse;

    async fn join(&self, request: ChessRequest) -> ChessResponse;

    async fn leave(&self, request: ChessRequest) -> ChessResponse;

    async fn make_move(&self, request: ChessRequest) -> ChessResponse;

    /// Routes a request by its `operation` field.
    async fn handle(&self, request: ChessRequest) -> ChessResponse {
        match request.operation {
            Operation::Create => self.create(request).await,
            Operation::Join => self.join(request).await,
            Operation::Leave => self.leave(request).await,
            Operation::Move => self.make_move(request).await,
        }
    }
}

/// Read access to the authoritative state of a game, for callers that may
/// have missed its notifications.
#[async_trait]
pub trait GameLookup: Send + Sync {
    async fn find_game(&self, game_id: &str) -> Result<Game, GameSessionServiceError>;
}
