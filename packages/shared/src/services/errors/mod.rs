pub mod chess_service_errors;
pub mod game_session_service_errors;
pub mod oracle_errors;
pub mod tournament_service_errors;
pub mod transport_errors;
