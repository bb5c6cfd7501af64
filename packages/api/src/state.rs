use std::sync::Arc;
use tracing::info_span;

use shared::{
    config::ArenaConfig,
    repositories::{
        game_repository::InMemoryGameRepository,
        tournament_repository::InMemoryTournamentRepository,
        user_repository::InMemoryUserRepository,
    },
    services::{
        chess_client::{local_client, ChessClient},
        chess_service::ChessService,
        game_session_service::GameSessionService,
        move_oracle::RandomMoveOracle,
        notifier::BroadcastNotifier,
        tournament_service::TournamentService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub game_session_service: Arc<GameSessionService>,
    pub tournament_service: Arc<TournamentService>,
    pub notifier: Arc<BroadcastNotifier>,
}

impl AppState {
    /// Wires every service over in-memory repositories and starts the
    /// tournament result watcher. Must be called inside a tokio runtime.
    pub fn in_memory(config: &ArenaConfig) -> Self {
        let notifier = Arc::new(BroadcastNotifier::new(config.event_capacity));
        let rules = Arc::new(ChessService::new());

        let game_session_service = Arc::new(
            GameSessionService::new(
                Arc::new(InMemoryGameRepository::new()),
                rules.clone(),
                notifier.clone(),
            )
            .with_span(info_span!("arena", service = "game_session")),
        );
        let client: Arc<dyn ChessClient> = Arc::new(local_client(game_session_service.clone()));

        let tournament_service = Arc::new(
            TournamentService::new(
                Arc::new(InMemoryTournamentRepository::new()),
                Arc::new(InMemoryUserRepository::new()),
                client,
                game_session_service.clone(),
                config.clone(),
            )
            .with_ai(Arc::new(RandomMoveOracle::new(rules)), notifier.clone())
            .with_span(info_span!("arena", service = "tournament")),
        );
        tokio::spawn(tournament_service.clone().watch(notifier.subscribe()));

        AppState {
            game_session_service,
            tournament_service,
            notifier,
        }
    }
}
