pub mod ai_player;
pub mod chess_client;
pub mod chess_server;
pub mod chess_service;
pub mod errors;
pub mod game_session_service;
pub mod locks;
pub mod move_oracle;
pub mod notifier;
pub mod pairing;
pub mod scoring;
pub mod tournament_service;
pub mod validation;
