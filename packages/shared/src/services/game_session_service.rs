use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument, Span};

use crate::{
    models::{
        chess_move::Move,
        game::{Game, GameStatus, Side},
        join::{Join, JoinStatus},
        protocol::{
            requests::{ChessRequest, Operation},
            responses::{ChessResponse, ResponseData},
        },
    },
    repositories::game_repository::{GameRepository, GameWrite},
    services::{
        chess_server::{ChessServer, GameLookup},
        chess_service::{position_key, Outcome, RulesProvider},
        errors::game_session_service_errors::GameSessionServiceError,
        locks::KeyedLocks,
        notifier::{GameEvent, GameNotifier},
        validation::{require_game_id, require_identity, require_join_id, require_move, require_seat},
    },
};

/// Occurrences of one position that end the game in a draw.
const REPETITION_LIMIT: usize = 3;

/// Authoritative per-game state machine:
/// `await -> ready -> continue -> terminal`, with `await` also able to end
/// directly as `cancelled` when a player leaves before the game starts.
pub struct GameSessionService {
    repository: Arc<dyn GameRepository + Send + Sync>,
    rules: Arc<dyn RulesProvider>,
    notifier: Arc<dyn GameNotifier>,
    locks: KeyedLocks,
    span: Span,
}

impl GameSessionService {
    pub fn new(
        repository: Arc<dyn GameRepository + Send + Sync>,
        rules: Arc<dyn RulesProvider>,
        notifier: Arc<dyn GameNotifier>,
    ) -> Self {
        GameSessionService {
            repository,
            rules,
            notifier,
            locks: KeyedLocks::new(),
            span: info_span!("game_session_service"),
        }
    }

    /// Parent span for every operation this service logs.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub async fn get_game(&self, game_id: &str) -> Result<Game, GameSessionServiceError> {
        self.repository
            .get_game(game_id)
            .await?
            .ok_or_else(|| GameSessionServiceError::NotFound(format!("game {} does not exist", game_id)))
    }

    pub async fn get_joins(&self, game_id: &str) -> Result<Vec<Join>, GameSessionServiceError> {
        self.get_game(game_id).await?;
        Ok(self.repository.get_joins(game_id).await?)
    }

    pub async fn get_moves(&self, game_id: &str) -> Result<Vec<Move>, GameSessionServiceError> {
        self.get_game(game_id).await?;
        Ok(self.repository.get_moves(game_id).await?)
    }

    pub async fn create_game(
        &self,
        request: &ChessRequest,
    ) -> Result<ResponseData, GameSessionServiceError> {
        require_identity(request)?;
        let (side, role) = require_seat(request)?;

        let game = Game::new(
            &self.rules.initial_position(),
            request.mode.unwrap_or_default(),
        );
        let join = Join::new(&game.id, &request.user_id, &request.client_id, side, role);
        Span::current().record("game_id", game.id.as_str());

        self.repository
            .commit(GameWrite::new(game.clone()).with_join(join.clone()))
            .await?;

        info!(
            "Game {} created by user {} (side {}, {:?})",
            game.id, request.user_id, side, role
        );
        self.publish(Operation::Create, &game);
        Ok(ResponseData::from_game(&game).with_join_id(&join.id))
    }

    pub async fn join_game(
        &self,
        request: &ChessRequest,
    ) -> Result<ResponseData, GameSessionServiceError> {
        require_identity(request)?;
        let game_id = require_game_id(request)?;
        let (side, role) = require_seat(request)?;

        let _guard = self.locks.lock(game_id).await;
        let mut game = self.get_game(game_id).await?;
        let joins = self.repository.get_joins(game_id).await?;

        let join = Join::new(game_id, &request.user_id, &request.client_id, side, role);
        if join.is_active_player() {
            if game.status.is_terminal() {
                return Err(GameSessionServiceError::State(format!(
                    "game {} is already over ({})",
                    game_id, game.status
                )));
            }
            if joins.iter().any(|existing| existing.holds(side)) {
                return Err(GameSessionServiceError::Conflict(format!(
                    "side {} is already taken",
                    side
                )));
            }
        }

        let both_seated = [Side::White, Side::Black].iter().all(|seat| {
            join.holds(*seat) || joins.iter().any(|existing| existing.holds(*seat))
        });
        if game.status == GameStatus::Await && both_seated {
            game.status = GameStatus::Ready;
            game.touch();
        }

        self.repository
            .commit(GameWrite::new(game.clone()).with_join(join.clone()))
            .await?;

        info!(
            "User {} joined game {} (side {}, {:?}); status {}",
            request.user_id, game_id, join.side, role, game.status
        );
        self.publish(Operation::Join, &game);
        Ok(ResponseData::from_game(&game).with_join_id(&join.id))
    }

    pub async fn move_piece(
        &self,
        request: &ChessRequest,
    ) -> Result<ResponseData, GameSessionServiceError> {
        require_identity(request)?;
        let game_id = require_game_id(request)?;
        let chess_move = require_move(request)?;

        let _guard = self.locks.lock(game_id).await;
        let mut game = self.get_game(game_id).await?;
        if game.status.is_terminal() {
            return Err(GameSessionServiceError::State(format!(
                "game {} is already over ({})",
                game_id, game.status
            )));
        }
        if !game.status.accepts_moves() {
            return Err(GameSessionServiceError::State(format!(
                "game {} is still waiting for players",
                game_id
            )));
        }

        let joins = self.repository.get_joins(game_id).await?;
        let mover = resolve_mover(request, &joins, game.side)?;
        if mover.side != game.side {
            return Err(GameSessionServiceError::Turn(format!(
                "it is side {}'s turn, not side {}",
                game.side, mover.side
            )));
        }

        let fen = self.rules.apply_move(&game.fen, chess_move)?;
        let outcome = self.rules.outcome(&fen)?;
        let moves = self.repository.get_moves(game_id).await?;
        let status = match outcome {
            Some(Outcome::Checkmate) => GameStatus::Checkmate,
            Some(Outcome::Stalemate) => GameStatus::Stalemate,
            Some(Outcome::Draw) => GameStatus::Draw,
            None if is_repetition(&moves, &fen) => GameStatus::Draw,
            None => GameStatus::Continue,
        };

        let record = Move::new(
            game_id,
            &mover.user_id,
            mover.side,
            moves.len() as u32 + 1,
            chess_move,
            &game.fen,
        );
        game.fen = fen;
        game.side = game.side.opponent();
        game.status = status;
        if status == GameStatus::Checkmate {
            game.winner = Some(mover.side);
        }
        game.touch();

        self.repository
            .commit(GameWrite::new(game.clone()).with_move(record))
            .await?;

        debug!(
            "Move {} played in game {} by side {}; status {}",
            chess_move, game_id, mover.side, game.status
        );
        if game.status.is_terminal() {
            info!("Game {} finished with {}", game_id, game.status);
        }
        self.publish(Operation::Move, &game);
        Ok(ResponseData::from_game(&game))
    }

    pub async fn leave_game(
        &self,
        request: &ChessRequest,
    ) -> Result<ResponseData, GameSessionServiceError> {
        require_identity(request)?;
        let game_id = require_game_id(request)?;
        let join_id = require_join_id(request)?;

        let _guard = self.locks.lock(game_id).await;
        let mut game = self.get_game(game_id).await?;
        let mut join = self
            .repository
            .get_join(join_id)
            .await?
            .filter(|join| join.game_id == game_id)
            .ok_or_else(|| {
                GameSessionServiceError::NotFound(format!(
                    "join {} does not exist in game {}",
                    join_id, game_id
                ))
            })?;
        if join.user_id != request.user_id {
            return Err(GameSessionServiceError::Validation(format!(
                "join {} does not belong to user {}",
                join_id, request.user_id
            )));
        }

        if join.status == JoinStatus::Left {
            debug!("Join {} already left game {}", join_id, game_id);
            return Ok(ResponseData::from_game(&game).with_join_id(join_id));
        }

        let was_player = join.is_active_player();
        join.leave();
        if was_player && !game.status.is_terminal() {
            match GameStatus::surrender_of(join.side) {
                Some(_) if game.status == GameStatus::Await => {
                    game.status = GameStatus::Cancelled;
                }
                Some(surrender) => {
                    game.status = surrender;
                    game.winner = Some(join.side.opponent());
                }
                None => {}
            }
            game.touch();
        }

        self.repository
            .commit(GameWrite::new(game.clone()).with_join(join.clone()))
            .await?;

        info!(
            "Join {} left game {} (side {}); status {}",
            join_id, game_id, join.side, game.status
        );
        self.publish(Operation::Leave, &game);
        Ok(ResponseData::from_game(&game).with_join_id(join_id))
    }

    fn publish(&self, operation: Operation, game: &Game) {
        self.notifier.notify(GameEvent::new(operation, game));
    }

    fn operation_span(&self, request: &ChessRequest) -> Span {
        info_span!(
            parent: &self.span,
            "game",
            op = %request.operation,
            game_id = request.game_id.as_deref().unwrap_or(""),
        )
    }
}

/// The player join a move is attributed to: the named join when `joinId` is
/// given, otherwise the user's active player join (preferring the side to
/// move when the user holds both).
fn resolve_mover<'a>(
    request: &ChessRequest,
    joins: &'a [Join],
    side_to_move: Side,
) -> Result<&'a Join, GameSessionServiceError> {
    if let Some(join_id) = request.join_id.as_deref() {
        let join = joins
            .iter()
            .find(|join| join.id == join_id)
            .ok_or_else(|| {
                GameSessionServiceError::NotFound(format!("join {} does not exist", join_id))
            })?;
        if !join.is_active_player() || join.user_id != request.user_id {
            return Err(GameSessionServiceError::Validation(format!(
                "join {} is not an active player seat of user {}",
                join_id, request.user_id
            )));
        }
        return Ok(join);
    }

    let seats: Vec<&Join> = joins
        .iter()
        .filter(|join| join.is_active_player() && join.user_id == request.user_id)
        .collect();
    seats
        .iter()
        .find(|join| join.side == side_to_move)
        .or_else(|| seats.first())
        .copied()
        .ok_or_else(|| {
            GameSessionServiceError::Validation(format!(
                "user {} is not playing in this game",
                request.user_id
            ))
        })
}

fn is_repetition(moves: &[Move], fen: &str) -> bool {
    let key = position_key(fen);
    let earlier = moves
        .iter()
        .filter(|recorded| position_key(&recorded.fen_before) == key)
        .count();
    earlier + 1 >= REPETITION_LIMIT
}

fn respond(result: Result<ResponseData, GameSessionServiceError>) -> ChessResponse {
    match result {
        Ok(data) => ChessResponse::ok(data),
        Err(err) => {
            match &err {
                GameSessionServiceError::Internal(_) => error!("{}", err),
                _ => debug!("Request rejected: {}", err),
            }
            ChessResponse::error(err)
        }
    }
}

#[async_trait]
impl ChessServer for GameSessionService {
    async fn create(&self, request: ChessRequest) -> ChessResponse {
        let span = info_span!(
            parent: &self.span,
            "game",
            op = %request.operation,
            game_id = tracing::field::Empty,
        );
        respond(self.create_game(&request).instrument(span).await)
    }

    async fn join(&self, request: ChessRequest) -> ChessResponse {
        let span = self.operation_span(&request);
        respond(self.join_game(&request).instrument(span).await)
    }

    async fn leave(&self, request: ChessRequest) -> ChessResponse {
        let span = self.operation_span(&request);
        respond(self.leave_game(&request).instrument(span).await)
    }

    async fn make_move(&self, request: ChessRequest) -> ChessResponse {
        let span = self.operation_span(&request);
        respond(self.move_piece(&request).instrument(span).await)
    }
}

#[async_trait]
impl GameLookup for GameSessionService {
    async fn find_game(&self, game_id: &str) -> Result<Game, GameSessionServiceError> {
        self.get_game(game_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{chess_move::MoveInput, join::Role},
        repositories::{
            errors::game_repository_errors::GameRepositoryError,
            game_repository::{InMemoryGameRepository, MockGameRepository},
        },
        services::{chess_service::ChessService, notifier::BroadcastNotifier},
    };

    fn service_with(repository: Arc<dyn GameRepository + Send + Sync>) -> GameSessionService {
        GameSessionService::new(
            repository,
            Arc::new(ChessService::new()),
            Arc::new(BroadcastNotifier::default()),
        )
    }

    fn service() -> GameSessionService {
        service_with(Arc::new(InMemoryGameRepository::new()))
    }

    struct Seated {
        game_id: String,
        white_join: String,
        black_join: String,
    }

    async fn seat_players(service: &GameSessionService) -> Seated {
        let created = service
            .create(ChessRequest::create("client-w", "white", Side::White, Role::Player))
            .await;
        let game_id = created.game_id().unwrap().to_string();
        let joined = service
            .join(ChessRequest::join("client-b", "black", &game_id, Side::Black, Role::Player))
            .await;
        Seated {
            white_join: created.join_id().unwrap().to_string(),
            black_join: joined.join_id().unwrap().to_string(),
            game_id,
        }
    }

    async fn play(service: &GameSessionService, game_id: &str, user: &str, from: &str, to: &str) -> ChessResponse {
        service
            .make_move(ChessRequest::make_move(
                &format!("client-{}", user),
                user,
                game_id,
                MoveInput::new(from, to),
            ))
            .await
    }

    #[tokio::test]
    async fn test_full_game_scenario() {
        let service = service();

        let created = service
            .create(ChessRequest::create("client-w", "white", Side::White, Role::Player))
            .await;
        assert_eq!(created.status(), Some(GameStatus::Await));
        let game_id = created.game_id().unwrap().to_string();

        let joined = service
            .join(ChessRequest::join("client-b", "black", &game_id, Side::Black, Role::Player))
            .await;
        assert_eq!(joined.status(), Some(GameStatus::Ready));

        let first = play(&service, &game_id, "white", "e2", "e4").await;
        assert_eq!(first.status(), Some(GameStatus::Continue));
        assert_eq!(first.side(), Some(Side::Black));

        play(&service, &game_id, "black", "e7", "e5").await;
        play(&service, &game_id, "white", "f1", "c4").await;
        play(&service, &game_id, "black", "b8", "c6").await;
        play(&service, &game_id, "white", "d1", "h5").await;
        play(&service, &game_id, "black", "g8", "f6").await;
        let mate = play(&service, &game_id, "white", "h5", "f7").await;

        assert_eq!(mate.status(), Some(GameStatus::Checkmate));
        let game = service.get_game(&game_id).await.unwrap();
        assert_eq!(game.winner, Some(Side::White));

        let after = play(&service, &game_id, "black", "e8", "e7").await;
        assert_eq!(after.error_kind(), Some("StateError"));
        assert_eq!(service.get_moves(&game_id).await.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_status_only_moves_forward() {
        let service = service();
        let seated = seat_players(&service).await;
        let mut ranks = vec![service.get_game(&seated.game_id).await.unwrap().status.rank()];

        for (user, from, to) in [
            ("white", "f2", "f3"),
            ("black", "e7", "e5"),
            ("white", "g2", "g4"),
            ("black", "d8", "h4"),
        ] {
            let response = play(&service, &seated.game_id, user, from, to).await;
            ranks.push(response.status().unwrap().rank());
        }

        assert!(ranks.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(
            service.get_game(&seated.game_id).await.unwrap().status,
            GameStatus::Checkmate
        );
    }

    #[tokio::test]
    async fn test_join_taken_side_conflicts() {
        let service = service();
        let created = service
            .create(ChessRequest::create("client-1", "alice", Side::White, Role::Player))
            .await;
        let game_id = created.game_id().unwrap();

        let response = service
            .join(ChessRequest::join("client-2", "bob", game_id, Side::White, Role::Player))
            .await;

        assert_eq!(response.error_kind(), Some("ConflictError"));
        assert_eq!(service.get_joins(game_id).await.unwrap().len(), 1);
        assert_eq!(
            service.get_game(game_id).await.unwrap().status,
            GameStatus::Await
        );
    }

    #[tokio::test]
    async fn test_spectator_join_does_not_start_game() {
        let service = service();
        let created = service
            .create(ChessRequest::create("client-1", "alice", Side::White, Role::Player))
            .await;
        let game_id = created.game_id().unwrap();

        let response = service
            .join(ChessRequest::join("client-2", "carol", game_id, Side::Black, Role::Spectator))
            .await;

        assert!(response.is_ok());
        assert_eq!(response.status(), Some(GameStatus::Await));
    }

    #[tokio::test]
    async fn test_join_unknown_game_is_not_found() {
        let service = service();

        let response = service
            .join(ChessRequest::join("client", "bob", "missing", Side::Black, Role::Player))
            .await;

        assert_eq!(response.error_kind(), Some("NotFoundError"));
    }

    #[tokio::test]
    async fn test_move_out_of_turn_leaves_game_unchanged() {
        let service = service();
        let seated = seat_players(&service).await;
        let before = service.get_game(&seated.game_id).await.unwrap();

        let response = play(&service, &seated.game_id, "black", "e7", "e5").await;

        assert_eq!(response.error_kind(), Some("TurnError"));
        let after = service.get_game(&seated.game_id).await.unwrap();
        assert_eq!(after.fen, before.fen);
        assert_eq!(after.status, before.status);
        assert!(service.get_moves(&seated.game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_illegal_move_is_rejected() {
        let service = service();
        let seated = seat_players(&service).await;

        let response = play(&service, &seated.game_id, "white", "e2", "e5").await;

        assert_eq!(response.error_kind(), Some("IllegalMoveError"));
        assert_eq!(
            service.get_game(&seated.game_id).await.unwrap().status,
            GameStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_move_before_opponent_joins_is_a_state_error() {
        let service = service();
        let created = service
            .create(ChessRequest::create("client-w", "white", Side::White, Role::Player))
            .await;

        let response = play(&service, created.game_id().unwrap(), "white", "e2", "e4").await;

        assert_eq!(response.error_kind(), Some("StateError"));
    }

    #[tokio::test]
    async fn test_move_by_outsider_is_invalid() {
        let service = service();
        let seated = seat_players(&service).await;

        let response = play(&service, &seated.game_id, "mallory", "e2", "e4").await;

        assert_eq!(response.error_kind(), Some("ValidationError"));
    }

    #[tokio::test]
    async fn test_move_with_someone_elses_join_is_invalid() {
        let service = service();
        let seated = seat_players(&service).await;

        let response = service
            .make_move(
                ChessRequest::make_move("client-b", "black", &seated.game_id, MoveInput::new("e2", "e4"))
                    .with_join_id(&seated.white_join),
            )
            .await;

        assert_eq!(response.error_kind(), Some("ValidationError"));
    }

    #[tokio::test]
    async fn test_leave_with_someone_elses_join_is_invalid() {
        let service = service();
        let seated = seat_players(&service).await;

        let response = service
            .leave(ChessRequest::leave("client-b", "black", &seated.game_id, &seated.white_join))
            .await;
        assert_eq!(response.error_kind(), Some("ValidationError"));

        let anonymous = service
            .leave(ChessRequest::leave("", "", &seated.game_id, &seated.white_join))
            .await;
        assert_eq!(anonymous.error_kind(), Some("ValidationError"));

        let game = service.get_game(&seated.game_id).await.unwrap();
        assert_eq!(game.status, GameStatus::Ready);
        assert_eq!(game.winner, None);
    }

    #[tokio::test]
    async fn test_threefold_repetition_is_a_draw() {
        let service = service();
        let seated = seat_players(&service).await;
        let shuffle = [
            ("white", "g1", "f3"),
            ("black", "g8", "f6"),
            ("white", "f3", "g1"),
            ("black", "f6", "g8"),
        ];

        let mut last = ChessResponse::default();
        for (user, from, to) in shuffle.iter().chain(shuffle.iter()) {
            last = play(&service, &seated.game_id, user, from, to).await;
        }

        assert_eq!(last.status(), Some(GameStatus::Draw));
    }

    #[tokio::test]
    async fn test_leave_before_start_cancels_game() {
        let service = service();
        let created = service
            .create(ChessRequest::create("client-w", "white", Side::White, Role::Player))
            .await;
        let game_id = created.game_id().unwrap();

        let response = service
            .leave(ChessRequest::leave("client-w", "white", game_id, created.join_id().unwrap()))
            .await;

        assert_eq!(response.status(), Some(GameStatus::Cancelled));
        assert_eq!(service.get_game(game_id).await.unwrap().winner, None);
    }

    #[tokio::test]
    async fn test_player_leaving_started_game_surrenders() {
        let service = service();
        let seated = seat_players(&service).await;
        play(&service, &seated.game_id, "white", "e2", "e4").await;

        let response = service
            .leave(ChessRequest::leave("client-w", "white", &seated.game_id, &seated.white_join))
            .await;

        assert_eq!(response.status(), Some(GameStatus::WhiteSurrender));
        let game = service.get_game(&seated.game_id).await.unwrap();
        assert_eq!(game.winner, Some(Side::Black));

        // a second leave changes nothing
        let again = service
            .leave(ChessRequest::leave("client-w", "white", &seated.game_id, &seated.white_join))
            .await;
        assert_eq!(again.status(), Some(GameStatus::WhiteSurrender));

        // the opponent leaving a finished game does not overwrite the result
        let black = service
            .leave(ChessRequest::leave("client-b", "black", &seated.game_id, &seated.black_join))
            .await;
        assert_eq!(black.status(), Some(GameStatus::WhiteSurrender));
    }

    #[tokio::test]
    async fn test_leave_with_unknown_join_is_not_found() {
        let service = service();
        let seated = seat_players(&service).await;

        let response = service
            .leave(ChessRequest::leave("client-w", "white", &seated.game_id, "missing"))
            .await;

        assert_eq!(response.error_kind(), Some("NotFoundError"));
    }

    #[tokio::test]
    async fn test_concurrent_moves_accept_exactly_one() {
        let service = Arc::new(service());
        let seated = seat_players(&service).await;

        let first = {
            let service = service.clone();
            let game_id = seated.game_id.clone();
            tokio::spawn(async move { play(&service, &game_id, "white", "e2", "e4").await })
        };
        let second = {
            let service = service.clone();
            let game_id = seated.game_id.clone();
            tokio::spawn(async move { play(&service, &game_id, "white", "d2", "d4").await })
        };
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| r.error_kind() == Some("TurnError")));
        assert_eq!(service.get_moves(&seated.game_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_moves_are_broadcast() {
        let notifier = Arc::new(BroadcastNotifier::default());
        let service = GameSessionService::new(
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(ChessService::new()),
            notifier.clone(),
        );
        let seated = seat_players(&service).await;
        let mut events = notifier.subscribe();

        play(&service, &seated.game_id, "white", "e2", "e4").await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.operation, Operation::Move);
        assert_eq!(event.side, Side::Black);
        assert_eq!(event.status, GameStatus::Continue);
    }

    #[tokio::test]
    async fn test_invalid_create_writes_nothing() {
        let mut repository = MockGameRepository::new();
        repository.expect_commit().never();
        let service = service_with(Arc::new(repository));

        let response = service
            .create(ChessRequest::create("client", "user", Side::None, Role::Player))
            .await;

        assert_eq!(response.error_kind(), Some("ValidationError"));
    }

    #[tokio::test]
    async fn test_storage_failure_becomes_error_value() {
        let mut repository = MockGameRepository::new();
        repository
            .expect_get_game()
            .returning(|_| Err(GameRepositoryError::Storage("disk on fire".to_string())));
        let service = service_with(Arc::new(repository));

        let response = service
            .join(ChessRequest::join("client", "bob", "game-1", Side::Black, Role::Player))
            .await;

        assert_eq!(response.error_kind(), Some("InternalError"));
    }
}
