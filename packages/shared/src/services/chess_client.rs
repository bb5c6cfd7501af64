use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::{
    models::protocol::{
        requests::{ChessRequest, Operation},
        responses::ChessResponse,
    },
    services::{chess_server::ChessServer, errors::transport_errors::TransportError},
};

#[cfg(test)]
use mockall::automock;

/// Moves one request to a server and brings its response back.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ChessRequest) -> Result<ChessResponse, TransportError>;
}

/// Caller-side view of the session protocol. Like the server, every call
/// resolves to a response value, including transport failures.
#[async_trait]
pub trait ChessClient: Send + Sync {
    async fn create(&self, request: ChessRequest) -> ChessResponse;

    async fn join(&self, request: ChessRequest) -> ChessResponse;

    async fn leave(&self, request: ChessRequest) -> ChessResponse;

    async fn make_move(&self, request: ChessRequest) -> ChessResponse;
}

pub struct TransportClient<T> {
    transport: T,
}

impl<T: Transport> TransportClient<T> {
    pub fn new(transport: T) -> Self {
        TransportClient { transport }
    }

    async fn call(&self, operation: Operation, mut request: ChessRequest) -> ChessResponse {
        request.operation = operation;
        request.updated_at = Utc::now().timestamp_millis();

        match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} request failed in transport: {}", operation, e);
                ChessResponse::error(e)
            }
        }
    }
}

#[async_trait]
impl<T: Transport> ChessClient for TransportClient<T> {
    async fn create(&self, request: ChessRequest) -> ChessResponse {
        self.call(Operation::Create, request).await
    }

    async fn join(&self, request: ChessRequest) -> ChessResponse {
        self.call(Operation::Join, request).await
    }

    async fn leave(&self, request: ChessRequest) -> ChessResponse {
        self.call(Operation::Leave, request).await
    }

    async fn make_move(&self, request: ChessRequest) -> ChessResponse {
        self.call(Operation::Move, request).await
    }
}

/// In-process transport. Each request runs as its own task, so a caller that
/// goes away mid-request does not abandon a half-applied operation.
#[derive(Clone)]
pub struct LocalTransport {
    server: Arc<dyn ChessServer>,
}

impl LocalTransport {
    pub fn new(server: Arc<dyn ChessServer>) -> Self {
        LocalTransport { server }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, request: ChessRequest) -> Result<ChessResponse, TransportError> {
        let server = self.server.clone();
        tokio::spawn(async move { server.handle(request).await })
            .await
            .map_err(|e| TransportError::Unreachable(format!("server task failed: {}", e)))
    }
}

/// Client wired straight to an in-process server.
pub fn local_client(server: Arc<dyn ChessServer>) -> TransportClient<LocalTransport> {
    TransportClient::new(LocalTransport::new(server))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{game::Side, join::Role, protocol::responses::ResponseData},
        repositories::game_repository::InMemoryGameRepository,
        services::{
            chess_service::ChessService, game_session_service::GameSessionService,
            notifier::BroadcastNotifier,
        },
    };

    struct PanickingServer;

    #[async_trait]
    impl ChessServer for PanickingServer {
        async fn create(&self, _request: ChessRequest) -> ChessResponse {
            panic!("server crashed")
        }

        async fn join(&self, _request: ChessRequest) -> ChessResponse {
            panic!("server crashed")
        }

        async fn leave(&self, _request: ChessRequest) -> ChessResponse {
            panic!("server crashed")
        }

        async fn make_move(&self, _request: ChessRequest) -> ChessResponse {
            panic!("server crashed")
        }
    }

    fn session_server() -> Arc<dyn ChessServer> {
        Arc::new(GameSessionService::new(
            Arc::new(InMemoryGameRepository::new()),
            Arc::new(ChessService::new()),
            Arc::new(BroadcastNotifier::default()),
        ))
    }

    #[tokio::test]
    async fn test_local_client_round_trip() {
        let client = local_client(session_server());

        let created = client
            .create(ChessRequest::create("c1", "alice", Side::White, Role::Player))
            .await;
        let game_id = created.game_id().unwrap().to_string();

        let joined = client
            .join(ChessRequest::join("c2", "bob", &game_id, Side::Black, Role::Player))
            .await;

        assert!(joined.is_ok(), "{:?}", joined.error);
        assert_eq!(joined.game_id(), Some(game_id.as_str()));
        assert!(joined.join_id().is_some());
    }

    #[tokio::test]
    async fn test_client_sets_operation_from_method() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|request| request.operation == Operation::Leave)
            .times(1)
            .returning(|_| Ok(ChessResponse::ok(ResponseData::default())));
        let client = TransportClient::new(transport);

        // built as a create request, sent through leave
        let request = ChessRequest::create("c1", "alice", Side::White, Role::Player);
        let response = client.leave(request).await;

        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error_response() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| Err(TransportError::Unreachable("connection refused".to_string())));
        let client = TransportClient::new(transport);

        let response = client
            .create(ChessRequest::create("c1", "alice", Side::White, Role::Player))
            .await;

        assert!(!response.is_ok());
        assert_eq!(response.error_kind(), Some("TransportError"));
    }

    #[tokio::test]
    async fn test_server_panic_is_a_transport_error() {
        let client = local_client(Arc::new(PanickingServer));

        let response = client
            .create(ChessRequest::create("c1", "alice", Side::White, Role::Player))
            .await;

        assert_eq!(response.error_kind(), Some("TransportError"));
        assert!(response.data.is_none());
    }
}
