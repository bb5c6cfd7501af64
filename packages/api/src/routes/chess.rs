use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use shared::{
    models::protocol::{requests::ChessRequest, responses::ChessResponse},
    services::chess_server::ChessServer,
};
use tracing::debug;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/chess", post(handle_request))
}

/// Protocol endpoint. Always answers 200; failures travel in `error`.
async fn handle_request(State(state): State<AppState>, body: Bytes) -> Json<ChessResponse> {
    let request: ChessRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejected malformed protocol request: {}", e);
            return Json(ChessResponse::error(format!(
                "ValidationError: malformed request: {}",
                e
            )));
        }
    };

    Json(state.game_session_service.handle(request).await)
}
