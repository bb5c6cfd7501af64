use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    config::ArenaConfig,
    models::{
        game::{GameStatus, Side},
        protocol::{
            requests::{ChessRequest, Operation},
            responses::ChessResponse,
        },
    },
    services::{
        chess_client::ChessClient, chess_server::GameLookup, errors::oracle_errors::OracleError,
        move_oracle::MoveOracle, notifier::GameEvent,
    },
};

/// Error kinds after which the player asks the oracle again.
const RETRYABLE_ERRORS: [&str; 2] = ["IllegalMoveError", "ValidationError"];

/// Where an AI player is seated.
#[derive(Debug, Clone, PartialEq)]
pub struct AiSeat {
    pub client_id: String,
    pub user_id: String,
    pub game_id: String,
    pub join_id: String,
    pub side: Side,
    pub difficulty: u8,
}

/// Plays one seat of one game through a `ChessClient`, asking a
/// `MoveOracle` for each move.
pub struct AiPlayer {
    client: Arc<dyn ChessClient>,
    games: Arc<dyn GameLookup>,
    oracle: Arc<dyn MoveOracle>,
    seat: AiSeat,
    timeout: Duration,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl AiPlayer {
    pub fn new(
        client: Arc<dyn ChessClient>,
        games: Arc<dyn GameLookup>,
        oracle: Arc<dyn MoveOracle>,
        seat: AiSeat,
        config: &ArenaConfig,
    ) -> Self {
        AiPlayer {
            client,
            games,
            oracle,
            seat,
            timeout: config.oracle_timeout,
            max_attempts: config.oracle_max_attempts.max(1),
            retry_backoff: config.ai_retry_backoff,
        }
    }

    /// Submits one move for `position`. Oracle timeouts and rejected
    /// suggestions are retried; after the last attempt the failure is
    /// returned as an error response and the game is left untouched.
    pub async fn play_turn(&self, position: &str) -> ChessResponse {
        let mut last_failure = String::new();

        for attempt in 1..=self.max_attempts {
            let suggested = tokio::time::timeout(
                self.timeout,
                self.oracle.suggest_move(position, self.seat.difficulty),
            )
            .await
            .unwrap_or(Err(OracleError::Timeout));

            let chess_move = match suggested {
                Ok(chess_move) => chess_move,
                Err(OracleError::NoMove) => {
                    return ChessResponse::error(format!("OracleError: {}", OracleError::NoMove));
                }
                Err(e) => {
                    warn!("Oracle attempt {}/{} failed: {}", attempt, self.max_attempts, e);
                    last_failure = e.to_string();
                    continue;
                }
            };

            let request = ChessRequest::make_move(
                &self.seat.client_id,
                &self.seat.user_id,
                &self.seat.game_id,
                chess_move.clone(),
            )
            .with_join_id(&self.seat.join_id);
            let response = self.client.make_move(request).await;

            match response.error_kind() {
                Some(kind) if RETRYABLE_ERRORS.contains(&kind) => {
                    warn!(
                        "Suggested move {} rejected on attempt {}/{}: {:?}",
                        chess_move, attempt, self.max_attempts, response.error
                    );
                    last_failure = response.error.clone().unwrap_or_default();
                }
                _ => return response,
            }
        }

        ChessResponse::error(format!(
            "OracleError: no acceptable move after {} attempts ({})",
            self.max_attempts, last_failure
        ))
    }

    /// Plays whenever the game reports this seat to move, until the game
    /// ends or the event stream closes. `current` is the game state the
    /// player was seated into. A turn that could not be played, or a gap in
    /// the event stream, is followed up after `ai_retry_backoff` from the
    /// game's stored state.
    pub async fn run(self, mut events: broadcast::Receiver<GameEvent>, current: GameEvent) {
        let span = info_span!("ai_player", game_id = %self.seat.game_id, side = %self.seat.side);

        async move {
            let mut next = Some(current);
            let mut retry_at: Option<Instant> = None;
            loop {
                if let Some(event) = next.take() {
                    if event.game_id == self.seat.game_id {
                        if event.status.is_terminal() {
                            info!("Game finished as {}", event.status);
                            break;
                        }
                        retry_at = None;
                        if self.is_my_turn(&event) {
                            let response = self.play_turn(&event.fen).await;
                            if let Some(error) = &response.error {
                                warn!("Turn not played, retrying in {:?}: {}", self.retry_backoff, error);
                                retry_at = Some(Instant::now() + self.retry_backoff);
                            }
                        }
                    }
                }

                let received = match retry_at {
                    Some(deadline) => tokio::time::timeout_at(deadline, events.recv()).await.ok(),
                    None => Some(events.recv().await),
                };
                next = match received {
                    Some(Ok(event)) => Some(event),
                    Some(Err(RecvError::Closed)) => break,
                    Some(Err(RecvError::Lagged(skipped))) => {
                        debug!("Skipped {} game events", skipped);
                        self.stored_state().await
                    }
                    None => self.stored_state().await,
                };
                if next.is_none() {
                    retry_at = Some(Instant::now() + self.retry_backoff);
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn stored_state(&self) -> Option<GameEvent> {
        match self.games.find_game(&self.seat.game_id).await {
            Ok(game) => Some(GameEvent::new(Operation::Move, &game)),
            Err(e) => {
                warn!("Could not read game state: {}", e);
                None
            }
        }
    }

    fn is_my_turn(&self, event: &GameEvent) -> bool {
        event.side == self.seat.side
            && matches!(event.status, GameStatus::Ready | GameStatus::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            chess_move::MoveInput,
            game::{Game, GameMode, STARTING_FEN},
            join::Role,
        },
        repositories::game_repository::InMemoryGameRepository,
        services::{
            chess_client::local_client,
            chess_service::ChessService,
            game_session_service::GameSessionService,
            move_oracle::{MockMoveOracle, RandomMoveOracle},
            notifier::BroadcastNotifier,
        },
    };

    struct Table {
        client: Arc<dyn ChessClient>,
        games: Arc<dyn GameLookup>,
        notifier: Arc<BroadcastNotifier>,
        white: AiSeat,
        black: AiSeat,
        ready: GameEvent,
    }

    async fn seated_table() -> Table {
        table_with_capacity(256).await
    }

    async fn table_with_capacity(capacity: usize) -> Table {
        let notifier = Arc::new(BroadcastNotifier::new(capacity));
        let server = Arc::new(GameSessionService::new(
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(ChessService::new()),
            notifier.clone(),
        ));
        let client: Arc<dyn ChessClient> = Arc::new(local_client(server.clone()));

        let created = client
            .create(ChessRequest::create("c-white", "white-bot", Side::White, Role::Player))
            .await;
        let game_id = created.game_id().unwrap().to_string();
        let joined = client
            .join(ChessRequest::join("c-black", "black-bot", &game_id, Side::Black, Role::Player))
            .await;

        let seat = |client_id: &str, user_id: &str, join_id: &str, side| AiSeat {
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            game_id: game_id.clone(),
            join_id: join_id.to_string(),
            side,
            difficulty: 1,
        };
        let white = seat("c-white", "white-bot", created.join_id().unwrap(), Side::White);
        let black = seat("c-black", "black-bot", joined.join_id().unwrap(), Side::Black);

        let mut game = Game::new(STARTING_FEN, GameMode::Classic);
        game.id = game_id.clone();
        game.status = GameStatus::Ready;

        Table {
            client,
            games: server,
            notifier,
            white,
            black,
            ready: GameEvent::new(Operation::Join, &game),
        }
    }

    fn config(attempts: u32, timeout: Duration) -> ArenaConfig {
        ArenaConfig {
            oracle_max_attempts: attempts,
            oracle_timeout: timeout,
            ai_retry_backoff: Duration::from_millis(20),
            ..ArenaConfig::default()
        }
    }

    #[tokio::test]
    async fn test_illegal_suggestion_is_retried() {
        let table = seated_table().await;
        let mut oracle = MockMoveOracle::new();
        let mut suggestions = vec![MoveInput::new("e2", "e4"), MoveInput::new("e2", "e5")];
        oracle
            .expect_suggest_move()
            .times(2)
            .returning(move |_, _| Ok(suggestions.pop().unwrap()));
        let player = AiPlayer::new(
            table.client.clone(),
            table.games.clone(),
            Arc::new(oracle),
            table.white.clone(),
            &config(3, Duration::from_secs(1)),
        );

        let response = player.play_turn(STARTING_FEN).await;

        assert!(response.is_ok(), "{:?}", response.error);
        assert_eq!(response.status(), Some(GameStatus::Continue));
        assert_eq!(response.side(), Some(Side::Black));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let table = seated_table().await;
        let mut oracle = MockMoveOracle::new();
        oracle
            .expect_suggest_move()
            .times(2)
            .returning(|_, _| Ok(MoveInput::new("e2", "e5")));
        let player = AiPlayer::new(
            table.client.clone(),
            table.games.clone(),
            Arc::new(oracle),
            table.white.clone(),
            &config(2, Duration::from_secs(1)),
        );

        let response = player.play_turn(STARTING_FEN).await;

        assert_eq!(response.error_kind(), Some("OracleError"));
    }

    #[tokio::test]
    async fn test_unavailable_oracle_is_retried() {
        let table = seated_table().await;
        let mut oracle = MockMoveOracle::new();
        let mut calls = 0;
        oracle.expect_suggest_move().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(OracleError::Unavailable("warming up".to_string()))
            } else {
                Ok(MoveInput::new("d2", "d4"))
            }
        });
        let player = AiPlayer::new(
            table.client.clone(),
            table.games.clone(),
            Arc::new(oracle),
            table.white.clone(),
            &config(2, Duration::from_secs(1)),
        );

        let response = player.play_turn(STARTING_FEN).await;

        assert!(response.is_ok(), "{:?}", response.error);
    }

    #[tokio::test]
    async fn test_timeout_does_not_end_the_game() {
        struct SlowOracle;

        #[async_trait::async_trait]
        impl MoveOracle for SlowOracle {
            async fn suggest_move(&self, _: &str, _: u8) -> Result<MoveInput, OracleError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(MoveInput::new("e2", "e4"))
            }
        }

        let table = seated_table().await;
        let player = AiPlayer::new(
            table.client.clone(),
            table.games.clone(),
            Arc::new(SlowOracle),
            table.white.clone(),
            &config(2, Duration::from_millis(10)),
        );

        let response = player.play_turn(STARTING_FEN).await;
        assert_eq!(response.error_kind(), Some("OracleError"));

        // the seat is still playable
        let retry = table
            .client
            .make_move(
                ChessRequest::make_move("c-white", "white-bot", &table.white.game_id, MoveInput::new("e2", "e4"))
                    .with_join_id(&table.white.join_id),
            )
            .await;
        assert!(retry.is_ok(), "{:?}", retry.error);
    }

    async fn wait_for_side(table: &Table, side: Side) -> Game {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let game = table.games.find_game(&table.white.game_id).await.unwrap();
                if game.side == side {
                    return game;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("AI player never moved")
    }

    #[tokio::test]
    async fn test_run_tries_again_after_a_failed_turn() {
        let table = seated_table().await;
        let mut oracle = MockMoveOracle::new();
        let mut calls = 0;
        oracle.expect_suggest_move().returning(move |_, _| {
            calls += 1;
            if calls <= 2 {
                Err(OracleError::Unavailable("restarting".to_string()))
            } else {
                Ok(MoveInput::new("d2", "d4"))
            }
        });
        let player = AiPlayer::new(
            table.client.clone(),
            table.games.clone(),
            Arc::new(oracle),
            table.white.clone(),
            &config(2, Duration::from_secs(1)),
        );

        tokio::spawn(player.run(table.notifier.subscribe(), table.ready.clone()));

        let game = wait_for_side(&table, Side::Black).await;
        assert_eq!(game.status, GameStatus::Continue);
    }

    #[tokio::test]
    async fn test_run_catches_up_after_missed_events() {
        let table = table_with_capacity(1).await;
        let events = table.notifier.subscribe();

        let opening = table
            .client
            .make_move(
                ChessRequest::make_move("c-white", "white-bot", &table.white.game_id, MoveInput::new("e2", "e4"))
                    .with_join_id(&table.white.join_id),
            )
            .await;
        assert!(opening.is_ok(), "{:?}", opening.error);
        let watching = table
            .client
            .join(ChessRequest::join("c-spec", "spectator", &table.white.game_id, Side::None, Role::Spectator))
            .await;
        assert!(watching.is_ok(), "{:?}", watching.error);

        let rules: Arc<ChessService> = Arc::new(ChessService::new());
        let player = AiPlayer::new(
            table.client.clone(),
            table.games.clone(),
            Arc::new(RandomMoveOracle::new(rules)),
            table.black.clone(),
            &config(3, Duration::from_secs(1)),
        );

        // the event that handed black the move has been overwritten
        tokio::spawn(player.run(events, table.ready.clone()));

        let game = wait_for_side(&table, Side::White).await;
        assert_eq!(game.status, GameStatus::Continue);
    }

    #[tokio::test]
    async fn test_two_ai_players_finish_a_game() {
        let table = seated_table().await;
        let rules: Arc<ChessService> = Arc::new(ChessService::new());
        let oracle: Arc<dyn MoveOracle> = Arc::new(RandomMoveOracle::new(rules));
        let settings = config(3, Duration::from_secs(1));

        let white = AiPlayer::new(table.client.clone(), table.games.clone(), oracle.clone(), table.white.clone(), &settings);
        let black = AiPlayer::new(table.client.clone(), table.games.clone(), oracle.clone(), table.black.clone(), &settings);
        let white_events = table.notifier.subscribe();
        let black_events = table.notifier.subscribe();
        let mut watcher = table.notifier.subscribe();

        tokio::spawn(white.run(white_events, table.ready.clone()));
        tokio::spawn(black.run(black_events, table.ready.clone()));

        let finished = tokio::time::timeout(Duration::from_secs(60), async move {
            loop {
                match watcher.recv().await {
                    Ok(event) if event.status.is_terminal() => return event,
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => panic!("event stream closed"),
                }
            }
        })
        .await
        .expect("random game did not finish");

        assert!(matches!(
            finished.status,
            GameStatus::Checkmate | GameStatus::Stalemate | GameStatus::Draw
        ));
    }
}
