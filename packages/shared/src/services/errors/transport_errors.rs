use std::fmt;

/// Communication failures between a client and a server. Business failures
/// never use this type; they arrive inside the response body.
#[derive(Debug)]
pub enum TransportError {
    Unreachable(String),
    Protocol(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::Unreachable(msg) => write!(f, "TransportError: server unreachable: {}", msg),
            TransportError::Protocol(msg) => write!(f, "TransportError: bad response: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}
