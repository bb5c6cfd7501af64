use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::{
    config::ArenaConfig,
    models::{
        game::{GameStatus, Side},
        join::Role,
        protocol::{
            requests::{ChessRequest, Operation},
            responses::{ChessResponse, ResponseData},
        },
        tournament::{
            GameOutcome, Participant, ParticipantRole, Score, Team, Tournament, TournamentGame,
            TournamentStatus, TournamentType,
        },
        user::User,
    },
    repositories::{
        errors::user_repository_errors::UserRepositoryError,
        tournament_repository::{TournamentRepository, TournamentWrite},
        user_repository::UserRepository,
    },
    services::{
        ai_player::{AiPlayer, AiSeat},
        chess_client::ChessClient,
        chess_server::GameLookup,
        errors::tournament_service_errors::TournamentServiceError,
        locks::KeyedLocks,
        move_oracle::MoveOracle,
        notifier::{BroadcastNotifier, GameEvent},
        pairing::{latest_by_slot, round_complete, strategy_for, Pairing, PairingStrategy},
        scoring::{compute_scores, leader, standings},
    },
};

type Result<T> = std::result::Result<T, TournamentServiceError>;

/// What AI-backed participants need to play their own games.
struct AiRuntime {
    oracle: Arc<dyn MoveOracle>,
    events: Arc<BroadcastNotifier>,
}

/// Runs tournaments on top of the game session protocol. Games are created
/// and seated through a `ChessClient`, exactly as any other client would;
/// results are read back from the authoritative game state.
pub struct TournamentService {
    repository: Arc<dyn TournamentRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    client: Arc<dyn ChessClient>,
    games: Arc<dyn GameLookup>,
    config: ArenaConfig,
    ai: Option<AiRuntime>,
    locks: KeyedLocks,
    span: Span,
}

impl TournamentService {
    pub fn new(
        repository: Arc<dyn TournamentRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        client: Arc<dyn ChessClient>,
        games: Arc<dyn GameLookup>,
        config: ArenaConfig,
    ) -> Self {
        TournamentService {
            repository,
            users,
            client,
            games,
            config,
            ai: None,
            locks: KeyedLocks::new(),
            span: info_span!("tournament_service"),
        }
    }

    /// Seats an `AiPlayer` for every AI-backed user in each created game.
    pub fn with_ai(mut self, oracle: Arc<dyn MoveOracle>, events: Arc<BroadcastNotifier>) -> Self {
        self.ai = Some(AiRuntime { oracle, events });
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn operation_span(&self, op: &'static str, tournament_id: &str) -> Span {
        info_span!(parent: &self.span, "tournament", op, tournament_id = %tournament_id)
    }

    pub async fn create_tournament(
        &self,
        organizer_id: &str,
        tournament_type: TournamentType,
    ) -> Result<Tournament> {
        if organizer_id.trim().is_empty() {
            return Err(TournamentServiceError::Validation(
                "organizerId is required".to_string(),
            ));
        }

        let tournament = Tournament::new(organizer_id, tournament_type);
        self.repository.create_tournament(&tournament).await?;

        info!(
            parent: &self.span,
            "Created {} tournament {} for organizer {}",
            tournament.tournament_type, tournament.id, organizer_id
        );
        Ok(tournament)
    }

    pub async fn get_tournament(&self, tournament_id: &str) -> Result<Tournament> {
        self.repository
            .get_tournament(tournament_id)
            .await?
            .ok_or_else(|| {
                TournamentServiceError::NotFound(format!("tournament {} does not exist", tournament_id))
            })
    }

    pub async fn participants(&self, tournament_id: &str) -> Result<Vec<Participant>> {
        self.get_tournament(tournament_id).await?;
        Ok(self.repository.get_participants(tournament_id).await?)
    }

    pub async fn tournament_games(&self, tournament_id: &str) -> Result<Vec<TournamentGame>> {
        self.get_tournament(tournament_id).await?;
        Ok(self.repository.get_tournament_games(tournament_id).await?)
    }

    pub async fn scores(&self, tournament_id: &str) -> Result<Vec<Score>> {
        self.get_tournament(tournament_id).await?;
        Ok(standings(&self.repository.get_scores(tournament_id).await?))
    }

    pub async fn add_participant(
        &self,
        tournament_id: &str,
        user_id: &str,
        role: ParticipantRole,
        team: Option<Team>,
    ) -> Result<Participant> {
        if user_id.trim().is_empty() {
            return Err(TournamentServiceError::Validation("userId is required".to_string()));
        }

        async move {
            let _guard = self.locks.lock(tournament_id).await;
            let tournament = self.get_tournament(tournament_id).await?;
            if tournament.status != TournamentStatus::Await {
                return Err(TournamentServiceError::State(format!(
                    "tournament {} is {}; participants are fixed once it starts",
                    tournament_id, tournament.status
                )));
            }

            let existing = self.repository.get_participants(tournament_id).await?;
            if existing.iter().any(|p| p.user_id == user_id) {
                return Err(TournamentServiceError::Conflict(format!(
                    "user {} already participates in tournament {}",
                    user_id, tournament_id
                )));
            }

            let mut participant = Participant::new(tournament_id, user_id, role, next_seed(&existing));
            participant.team = team;
            self.repository.add_participant(&participant).await?;

            info!("User {} joined as {:?} (seed {})", user_id, role, participant.seed);
            Ok(participant)
        }
        .instrument(self.operation_span("add_participant", tournament_id))
        .await
    }

    /// Adds AI-backed players until the tournament has `target` players.
    /// Existing AI users not yet in the tournament are used before new ones
    /// are provisioned.
    pub async fn top_up_ai_participants(
        &self,
        tournament_id: &str,
        target: usize,
    ) -> Result<Vec<Participant>> {
        async move {
            let _guard = self.locks.lock(tournament_id).await;
            let tournament = self.get_tournament(tournament_id).await?;
            if tournament.status != TournamentStatus::Await {
                return Err(TournamentServiceError::State(format!(
                    "tournament {} is {}; participants are fixed once it starts",
                    tournament_id, tournament.status
                )));
            }

            let existing = self.repository.get_participants(tournament_id).await?;
            let players = existing.iter().filter(|p| p.is_player()).count();
            if players >= target {
                debug!("Already {} players, target {}", players, target);
                return Ok(Vec::new());
            }
            let needed = target - players;

            let taken: HashSet<&str> = existing.iter().map(|p| p.user_id.as_str()).collect();
            let mut users: Vec<User> = self
                .users
                .list_ai_users()
                .await?
                .into_iter()
                .filter(|user| !taken.contains(user.id.as_str()))
                .take(needed)
                .collect();
            let reused = users.len();

            while users.len() < needed {
                let suffix = Uuid::new_v4().to_string();
                let user = User::new_ai(
                    format!("{}-{}", self.config.ai_name_prefix, &suffix[..8]),
                    self.config.ai_difficulty,
                );
                self.users.create_user(&user).await?;
                users.push(user);
            }

            let first_seed = next_seed(&existing);
            let added: Vec<Participant> = users
                .iter()
                .enumerate()
                .map(|(i, user)| {
                    Participant::new(tournament_id, &user.id, ParticipantRole::Player, first_seed + i as u32)
                })
                .collect();

            self.repository
                .commit(TournamentWrite {
                    participants: added.clone(),
                    ..TournamentWrite::default()
                })
                .await?;

            info!(
                "Added {} AI players ({} reused, {} provisioned)",
                added.len(),
                reused,
                added.len() - reused
            );
            Ok(added)
        }
        .instrument(self.operation_span("top_up_ai", tournament_id))
        .await
    }

    /// Pairs round one and creates its games. Only the organizer can start a
    /// tournament, and only once.
    pub async fn start(&self, tournament_id: &str, organizer_id: &str) -> Result<Tournament> {
        async move {
            let _guard = self.locks.lock(tournament_id).await;
            let mut tournament = self.get_tournament(tournament_id).await?;
            if tournament.organizer_id != organizer_id {
                return Err(TournamentServiceError::Validation(format!(
                    "only the organizer can start tournament {}",
                    tournament_id
                )));
            }
            if tournament.status != TournamentStatus::Await {
                return Err(TournamentServiceError::State(format!(
                    "tournament {} has already started",
                    tournament_id
                )));
            }

            let players = self.players(tournament_id).await?;
            let strategy = strategy_for(tournament.tournament_type);
            let rounds = strategy.total_rounds(&players)?;
            let pairings = strategy.pair_round(1, &players, &[])?;
            let games = self.create_games(&tournament, &players, &pairings).await?;

            tournament.status = TournamentStatus::Ready;
            tournament.current_round = 1;
            tournament.touch();
            self.repository
                .commit(TournamentWrite {
                    tournament: Some(tournament.clone()),
                    games,
                    scores: Some(compute_scores(&players, &[])),
                    ..TournamentWrite::default()
                })
                .await?;

            info!(
                "Started with {} players: {} games in round 1 of {}",
                players.len(),
                pairings.len(),
                rounds
            );
            Ok(tournament)
        }
        .instrument(self.operation_span("start", tournament_id))
        .await
    }

    /// Applies a finished game to its tournament: scores, knockout
    /// elimination or replay, and the next round once the current one is
    /// over. The result is taken from the stored game, not from the event.
    /// Returns `None` for games outside any tournament or still in
    /// progress. Recording the same game again changes nothing.
    pub async fn record_game_result(&self, event: &GameEvent) -> Result<Option<Tournament>> {
        if !event.status.is_terminal() {
            return Ok(None);
        }
        self.record_stored_result(&event.game_id).await
    }

    /// Records every finished tournament game whose result is missing, as
    /// after the watcher fell behind the event stream. Returns how many
    /// results were recorded.
    pub async fn reconcile(&self) -> Result<usize> {
        let open = self.repository.get_open_tournament_games().await?;
        let mut recorded = 0;
        for game in open {
            match self.record_stored_result(&game.game_id).await {
                Ok(Some(_)) => recorded += 1,
                Ok(None) => {}
                Err(e) => warn!(parent: &self.span, "Could not record game {}: {}", game.game_id, e),
            }
        }
        Ok(recorded)
    }

    async fn record_stored_result(&self, game_id: &str) -> Result<Option<Tournament>> {
        let Some(found) = self.repository.find_tournament_game(game_id).await? else {
            return Ok(None);
        };

        let span = self.operation_span("record_result", &found.tournament_id);
        async move {
            let _guard = self.locks.lock(&found.tournament_id).await;
            let mut tournament = self.get_tournament(&found.tournament_id).await?;
            let mut games = self.repository.get_tournament_games(&tournament.id).await?;

            let Some(position) = games.iter().position(|g| g.id == found.id) else {
                return Err(TournamentServiceError::NotFound(format!(
                    "tournament game {} disappeared",
                    found.id
                )));
            };
            if games[position].is_complete() {
                debug!("Result of game {} already recorded", game_id);
                return Ok(Some(tournament));
            }

            let session = self
                .games
                .find_game(game_id)
                .await
                .map_err(|e| TournamentServiceError::GameSession(e.to_string()))?;
            let Some(outcome) = GameOutcome::from_status(session.status, session.winner) else {
                debug!("Game {} is still {}", game_id, session.status);
                return Ok(None);
            };

            games[position].result = Some(session.status);
            games[position].outcome = Some(outcome);
            let game = games[position].clone();
            info!(
                "Game {} (round {}, slot {}) finished as {}",
                game.game_id, game.round, game.slot, session.status
            );

            let mut write = TournamentWrite::default();
            write.games.push(game.clone());

            let mut players = self.players(&tournament.id).await?;
            let strategy = strategy_for(tournament.tournament_type);

            if strategy.replays_undecided() {
                match game.loser() {
                    Some(loser) => {
                        if let Some(player) = players.iter_mut().find(|p| p.id == loser) {
                            player.eliminated = true;
                            write.participants.push(player.clone());
                        }
                    }
                    None => {
                        let replay = Pairing::from_replay(&game);
                        let replayed = self.create_games(&tournament, &players, &[replay]).await?;
                        info!("Replaying round {} slot {} with colours swapped", game.round, game.slot);
                        games.extend(replayed.iter().cloned());
                        write.games.extend(replayed);
                    }
                }
            }

            if tournament.status == TournamentStatus::Ready {
                tournament.status = TournamentStatus::Continue;
            }

            let scores = compute_scores(&players, &games);
            if game.round == tournament.current_round
                && round_complete(strategy.as_ref(), tournament.current_round, &games)
            {
                let total = strategy.total_rounds(&players)?;
                if tournament.current_round < total {
                    let next = tournament.current_round + 1;
                    let pairings = strategy.pair_round(next, &players, &games)?;
                    let created = self.create_games(&tournament, &players, &pairings).await?;
                    write.games.extend(created);
                    tournament.current_round = next;
                    info!("Round {} paired: {} games", next, pairings.len());
                } else {
                    tournament.status = TournamentStatus::Finished;
                    tournament.winner_id =
                        champion(strategy.as_ref(), &tournament, &players, &games, &scores);
                    info!("Finished; winner {:?}", tournament.winner_id);
                }
            }

            tournament.touch();
            write.tournament = Some(tournament.clone());
            write.scores = Some(scores);
            self.repository.commit(write).await?;
            Ok(Some(tournament))
        }
        .instrument(span)
        .await
    }

    /// Records every terminal game event until the stream closes. Events
    /// lost to a lagging receiver are recovered with `reconcile`.
    pub async fn watch(self: Arc<Self>, mut events: broadcast::Receiver<GameEvent>) {
        loop {
            match events.recv().await {
                Ok(event) if event.status.is_terminal() => {
                    if let Err(e) = self.record_game_result(&event).await {
                        error!(parent: &self.span, "Failed to record result of game {}: {}", event.game_id, e);
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(parent: &self.span, "Tournament watcher skipped {} game events", skipped);
                    match self.reconcile().await {
                        Ok(recorded) => info!(parent: &self.span, "Recorded {} missed results", recorded),
                        Err(e) => error!(parent: &self.span, "Failed to recover missed results: {}", e),
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn players(&self, tournament_id: &str) -> Result<Vec<Participant>> {
        Ok(self
            .repository
            .get_participants(tournament_id)
            .await?
            .into_iter()
            .filter(|p| p.is_player())
            .collect())
    }

    async fn create_games(
        &self,
        tournament: &Tournament,
        players: &[Participant],
        pairings: &[Pairing],
    ) -> Result<Vec<TournamentGame>> {
        try_join_all(
            pairings
                .iter()
                .map(|pairing| self.create_game(tournament, players, pairing)),
        )
        .await
    }

    /// The organizer opens the game as a spectator, then both players are
    /// seated, which moves it to `ready`.
    async fn create_game(
        &self,
        tournament: &Tournament,
        players: &[Participant],
        pairing: &Pairing,
    ) -> Result<TournamentGame> {
        let white = find_player(players, &pairing.white)?;
        let black = find_player(players, &pairing.black)?;

        let created = self
            .client
            .create(ChessRequest::create(
                &client_id(tournament, &tournament.organizer_id),
                &tournament.organizer_id,
                Side::None,
                Role::Spectator,
            ))
            .await;
        let game_id = session_data(created)?
            .game_id
            .ok_or_else(|| TournamentServiceError::GameSession("create returned no gameId".to_string()))?;

        let ai_seats = self.subscribe_ai_seats(white, black).await;

        let white_join = self.seat(tournament, &game_id, white, Side::White).await?;
        let black_join = self.seat(tournament, &game_id, black, Side::Black).await?;

        if let Some(runtime) = &self.ai {
            let seated = GameEvent {
                game_id: game_id.clone(),
                operation: Operation::Join,
                fen: black_join.fen.clone().unwrap_or_default(),
                status: black_join.status.unwrap_or(GameStatus::Ready),
                side: black_join.side.unwrap_or(Side::White),
                winner: None,
            };
            for (user, side, events) in ai_seats {
                let join = if side == Side::White { &white_join } else { &black_join };
                let seat = AiSeat {
                    client_id: client_id(tournament, &user.id),
                    user_id: user.id.clone(),
                    game_id: game_id.clone(),
                    join_id: join.join_id.clone().unwrap_or_default(),
                    side,
                    difficulty: user.difficulty.unwrap_or(self.config.ai_difficulty),
                };
                debug!("AI user {} plays {} in game {}", user.id, side, game_id);
                let player = AiPlayer::new(
                    self.client.clone(),
                    self.games.clone(),
                    runtime.oracle.clone(),
                    seat,
                    &self.config,
                );
                tokio::spawn(player.run(events, seated.clone()));
            }
        }

        Ok(TournamentGame::new(
            &tournament.id,
            &game_id,
            pairing.round,
            pairing.slot,
            &white.id,
            &black.id,
        ))
    }

    async fn seat(
        &self,
        tournament: &Tournament,
        game_id: &str,
        participant: &Participant,
        side: Side,
    ) -> Result<ResponseData> {
        let response = self
            .client
            .join(ChessRequest::join(
                &client_id(tournament, &participant.user_id),
                &participant.user_id,
                game_id,
                side,
                Role::Player,
            ))
            .await;
        session_data(response)
    }

    /// Event receivers for the AI-backed players of a game, opened before
    /// they are seated so no move is missed.
    async fn subscribe_ai_seats(
        &self,
        white: &Participant,
        black: &Participant,
    ) -> Vec<(User, Side, broadcast::Receiver<GameEvent>)> {
        let Some(runtime) = &self.ai else {
            return Vec::new();
        };

        let mut seats = Vec::new();
        for (participant, side) in [(white, Side::White), (black, Side::Black)] {
            match self.users.get_user_by_id(&participant.user_id).await {
                Ok(user) if user.is_ai() => seats.push((user, side, runtime.events.subscribe())),
                Ok(_) | Err(UserRepositoryError::NotFound) => {}
                Err(e) => warn!("Could not look up user {}: {}", participant.user_id, e),
            }
        }
        seats
    }
}

fn next_seed(participants: &[Participant]) -> u32 {
    participants.iter().map(|p| p.seed + 1).max().unwrap_or(0)
}

fn client_id(tournament: &Tournament, user_id: &str) -> String {
    format!("tournament-{}-{}", tournament.id, user_id)
}

fn find_player<'a>(players: &'a [Participant], participant_id: &str) -> Result<&'a Participant> {
    players
        .iter()
        .find(|p| p.id == participant_id)
        .ok_or_else(|| TournamentServiceError::NotFound(format!("participant {}", participant_id)))
}

fn session_data(response: ChessResponse) -> Result<ResponseData> {
    if let Some(error) = response.error {
        return Err(TournamentServiceError::GameSession(error));
    }
    response
        .data
        .ok_or_else(|| TournamentServiceError::GameSession("response carried no data".to_string()))
}

/// User id of the winner: the final's victor in a knockout, otherwise the
/// sole points leader.
fn champion(
    strategy: &dyn PairingStrategy,
    tournament: &Tournament,
    players: &[Participant],
    games: &[TournamentGame],
    scores: &[Score],
) -> Option<String> {
    let participant_id = if strategy.replays_undecided() {
        latest_by_slot(tournament.current_round, games)
            .values()
            .next()
            .and_then(|game| game.winner())
            .map(str::to_string)
    } else {
        leader(scores).map(|score| score.participant_id.clone())
    }?;

    players
        .iter()
        .find(|p| p.id == participant_id)
        .map(|p| p.user_id.clone())
}
