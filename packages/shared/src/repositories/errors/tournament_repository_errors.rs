#[derive(Debug)]
pub enum TournamentRepositoryError {
    NotFound(String),
    AlreadyExists(String),
    Storage(String),
}

impl std::fmt::Display for TournamentRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentRepositoryError::NotFound(id) => write!(f, "Tournament record not found: {}", id),
            TournamentRepositoryError::AlreadyExists(id) => {
                write!(f, "Tournament record already exists: {}", id)
            }
            TournamentRepositoryError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for TournamentRepositoryError {}
