use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::models::tournament::{
    Participant, ParticipantRole, Score, Team, Tournament, TournamentGame, TournamentType,
};
use tracing::{error, info};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentRequest {
    pub organizer_id: String,
    #[serde(rename = "type")]
    pub tournament_type: TournamentType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantRequest {
    pub user_id: String,
    pub role: Option<ParticipantRole>,
    pub team: Option<Team>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTournamentRequest {
    pub organizer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub target: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tournaments", post(create_tournament))
        .route("/tournaments/{tournament_id}", get(get_tournament))
        .route(
            "/tournaments/{tournament_id}/participants",
            get(get_participants).post(add_participant),
        )
        .route("/tournaments/{tournament_id}/ai-participants", post(top_up_ai))
        .route("/tournaments/{tournament_id}/start", post(start_tournament))
        .route("/tournaments/{tournament_id}/games", get(get_games))
        .route("/tournaments/{tournament_id}/scores", get(get_scores))
}

async fn create_tournament(
    State(state): State<AppState>,
    Json(request): Json<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let tournament = state
        .tournament_service
        .create_tournament(&request.organizer_id, request.tournament_type)
        .await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Tournament>, ApiError> {
    Ok(Json(state.tournament_service.get_tournament(&tournament_id).await?))
}

async fn get_participants(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    Ok(Json(state.tournament_service.participants(&tournament_id).await?))
}

async fn add_participant(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
    Json(request): Json<AddParticipantRequest>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let participant = state
        .tournament_service
        .add_participant(
            &tournament_id,
            &request.user_id,
            request.role.unwrap_or(ParticipantRole::Player),
            request.team,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

async fn top_up_ai(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
    Json(request): Json<TopUpRequest>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    Ok(Json(
        state
            .tournament_service
            .top_up_ai_participants(&tournament_id, request.target)
            .await?,
    ))
}

async fn start_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
    Json(request): Json<StartTournamentRequest>,
) -> Result<Json<Tournament>, ApiError> {
    let tournament = state
        .tournament_service
        .start(&tournament_id, &request.organizer_id)
        .await
        .map_err(|e| {
            error!("Failed to start tournament {}: {}", tournament_id, e);
            ApiError::from(e)
        })?;
    info!("Tournament {} started", tournament_id);
    Ok(Json(tournament))
}

async fn get_games(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Vec<TournamentGame>>, ApiError> {
    Ok(Json(state.tournament_service.tournament_games(&tournament_id).await?))
}

async fn get_scores(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Vec<Score>>, ApiError> {
    Ok(Json(state.tournament_service.scores(&tournament_id).await?))
}
