//! Request field checks shared by the protocol operations. They run before
//! any record is read or written.

use crate::models::{
    chess_move::MoveInput,
    game::Side,
    join::Role,
    protocol::requests::ChessRequest,
};
use crate::services::errors::game_session_service_errors::GameSessionServiceError;

type Result<T> = std::result::Result<T, GameSessionServiceError>;

fn missing(field: &str) -> GameSessionServiceError {
    GameSessionServiceError::Validation(format!("{} is required", field))
}

pub fn require_identity(request: &ChessRequest) -> Result<()> {
    if request.client_id.trim().is_empty() {
        return Err(missing("clientId"));
    }
    if request.user_id.trim().is_empty() {
        return Err(missing("userId"));
    }
    Ok(())
}

pub fn require_game_id(request: &ChessRequest) -> Result<&str> {
    request
        .game_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| missing("gameId"))
}

pub fn require_join_id(request: &ChessRequest) -> Result<&str> {
    request
        .join_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| missing("joinId"))
}

/// Side and role for a create or join. Players must pick white (1) or black
/// (2); spectators never hold a side.
pub fn require_seat(request: &ChessRequest) -> Result<(Side, Role)> {
    let side = request.side.ok_or_else(|| missing("side"))?;
    let role = request.role.ok_or_else(|| missing("role"))?;
    match role {
        Role::Player if !side.is_player_side() => Err(GameSessionServiceError::Validation(
            format!("players must take side 1 or 2, got {}", side),
        )),
        Role::Player => Ok((side, role)),
        Role::Spectator => Ok((Side::None, role)),
    }
}

pub fn require_move(request: &ChessRequest) -> Result<&MoveInput> {
    let chess_move = request.chess_move.as_ref().ok_or_else(|| missing("move"))?;
    if chess_move.from.trim().is_empty() || chess_move.to.trim().is_empty() {
        return Err(GameSessionServiceError::Validation(
            "move requires both from and to squares".to_string(),
        ));
    }
    Ok(chess_move)
}
