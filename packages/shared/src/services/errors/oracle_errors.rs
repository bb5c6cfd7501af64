use std::fmt;

use crate::services::errors::chess_service_errors::ChessServiceError;

#[derive(Debug)]
pub enum OracleError {
    Timeout,
    Unavailable(String),
    NoMove,
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OracleError::Timeout => write!(f, "Move oracle timed out"),
            OracleError::Unavailable(msg) => write!(f, "Move oracle unavailable: {}", msg),
            OracleError::NoMove => write!(f, "Move oracle has no move for this position"),
        }
    }
}

impl std::error::Error for OracleError {}

impl From<ChessServiceError> for OracleError {
    fn from(err: ChessServiceError) -> Self {
        OracleError::Unavailable(err.to_string())
    }
}
