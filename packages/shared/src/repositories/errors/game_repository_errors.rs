#[derive(Debug)]
pub enum GameRepositoryError {
    NotFound(String),
    SequenceConflict { expected: u32, actual: u32 },
    Storage(String),
}

impl std::fmt::Display for GameRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameRepositoryError::NotFound(id) => write!(f, "Record not found: {}", id),
            GameRepositoryError::SequenceConflict { expected, actual } => write!(
                f,
                "Move sequence conflict: expected {}, got {}",
                expected, actual
            ),
            GameRepositoryError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for GameRepositoryError {}
