use arena_api::{app, state::AppState, transport::HttpTransport};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use shared::{
    config::ArenaConfig,
    models::{
        chess_move::MoveInput,
        game::{GameStatus, Side},
        join::Role,
        protocol::requests::ChessRequest,
    },
    services::chess_client::{ChessClient, TransportClient},
};
use tower::ServiceExt;

/// Serves the app on an ephemeral port and returns its base URL.
async fn spawn_server() -> String {
    let state = AppState::in_memory(&ArenaConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let address = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app(state))
            .await
            .expect("Test server failed");
    });
    format!("http://{}", address)
}

#[tokio::test]
async fn test_health_endpoint() -> anyhow::Result<()> {
    let router = app(AppState::in_memory(&ArenaConfig::default()));

    let response = router
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_game_over_http_transport() {
    let base_url = spawn_server().await;
    let client = TransportClient::new(HttpTransport::new(&base_url));

    let created = client
        .create(ChessRequest::create("c1", "alice", Side::White, Role::Player))
        .await;
    assert!(created.is_ok(), "{:?}", created.error);
    let game_id = created.game_id().unwrap().to_string();
    let white_join = created.join_id().unwrap().to_string();

    let joined = client
        .join(ChessRequest::join("c2", "bob", &game_id, Side::Black, Role::Player))
        .await;
    assert_eq!(joined.status(), Some(GameStatus::Ready));

    let moved = client
        .make_move(
            ChessRequest::make_move("c1", "alice", &game_id, MoveInput::new("e2", "e4"))
                .with_join_id(&white_join),
        )
        .await;
    assert_eq!(moved.status(), Some(GameStatus::Continue));
    assert_eq!(moved.side(), Some(Side::Black));

    let out_of_turn = client
        .make_move(
            ChessRequest::make_move("c1", "alice", &game_id, MoveInput::new("d2", "d4"))
                .with_join_id(&white_join),
        )
        .await;
    assert_eq!(out_of_turn.error_kind(), Some("TurnError"));

    let left = client
        .leave(ChessRequest::leave("c1", "alice", &game_id, &white_join))
        .await;
    assert_eq!(left.status(), Some(GameStatus::WhiteSurrender));

    let game: Value = reqwest::get(format!("{}/games/{}", base_url, game_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(game["status"], "white_surrender");
    assert_eq!(game["winner"], 2);

    let moves: Vec<Value> = reqwest::get(format!("{}/games/{}/moves", base_url, game_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(moves.len(), 1);
}

#[tokio::test]
async fn test_malformed_protocol_request_is_a_validation_error() {
    let base_url = spawn_server().await;

    let response = reqwest::Client::new()
        .post(format!("{}/chess", base_url))
        .header("content-type", "application/json")
        .body("{\"operation\": \"teleport\"}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("ValidationError"));
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_unknown_game_is_not_found() -> anyhow::Result<()> {
    let router = app(AppState::in_memory(&ArenaConfig::default()));

    let response = router
        .oneshot(Request::get("/games/missing").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    let client = TransportClient::new(HttpTransport::new(&format!("http://{}", address)));

    let response = client
        .create(ChessRequest::create("c1", "alice", Side::White, Role::Player))
        .await;

    assert_eq!(response.error_kind(), Some("TransportError"));
}

#[tokio::test]
async fn test_tournament_lifecycle() {
    let base_url = spawn_server().await;
    let http = reqwest::Client::new();

    let created = http
        .post(format!("{}/tournaments", base_url))
        .json(&json!({ "organizerId": "org", "type": "round-robin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), reqwest::StatusCode::CREATED);
    let tournament: Value = created.json().await.unwrap();
    assert_eq!(tournament["status"], "await");
    let tournament_id = tournament["id"].as_str().unwrap().to_string();

    for user in ["ann", "ben", "cat", "dan"] {
        let added = http
            .post(format!("{}/tournaments/{}/participants", base_url, tournament_id))
            .json(&json!({ "userId": user }))
            .send()
            .await
            .unwrap();
        assert_eq!(added.status(), reqwest::StatusCode::CREATED);
    }

    let start_url = format!("{}/tournaments/{}/start", base_url, tournament_id);
    let started = http
        .post(&start_url)
        .json(&json!({ "organizerId": "org" }))
        .send()
        .await
        .unwrap();
    assert_eq!(started.status(), reqwest::StatusCode::OK);
    let started: Value = started.json().await.unwrap();
    assert_eq!(started["status"], "ready");

    let again = http
        .post(&start_url)
        .json(&json!({ "organizerId": "org" }))
        .send()
        .await
        .unwrap();
    assert!(again.status().is_client_error());
    let error: Value = again.json().await.unwrap();
    assert!(error["error"].as_str().unwrap().starts_with("StateError"));

    let games: Vec<Value> = http
        .get(format!("{}/tournaments/{}/games", base_url, tournament_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(games.len(), 2);

    let scores: Vec<Value> = http
        .get(format!("{}/tournaments/{}/scores", base_url, tournament_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scores.len(), 4);
}

#[tokio::test]
async fn test_ai_top_up_over_http() {
    let base_url = spawn_server().await;
    let http = reqwest::Client::new();
    let tournament: Value = http
        .post(format!("{}/tournaments", base_url))
        .json(&json!({ "organizerId": "org", "type": "knockout" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let tournament_id = tournament["id"].as_str().unwrap();

    let added: Vec<Value> = http
        .post(format!("{}/tournaments/{}/ai-participants", base_url, tournament_id))
        .json(&json!({ "target": 3 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(added.len(), 3);
    assert!(added.iter().all(|p| p["role"] == "player"));
}
