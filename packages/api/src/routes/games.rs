use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use shared::models::{chess_move::Move, game::Game};

use crate::{error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games/{game_id}", get(get_game))
        .route("/games/{game_id}/moves", get(get_moves))
}

async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<Game>, ApiError> {
    Ok(Json(state.game_session_service.get_game(&game_id).await?))
}

async fn get_moves(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<Vec<Move>>, ApiError> {
    Ok(Json(state.game_session_service.get_moves(&game_id).await?))
}
