use async_trait::async_trait;
use shared::{
    models::protocol::{requests::ChessRequest, responses::ChessResponse},
    services::{chess_client::Transport, errors::transport_errors::TransportError},
};

/// Sends protocol requests to a remote `POST /chess` endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chess", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ChessRequest) -> Result<ChessResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Protocol(format!(
                "{} answered {}",
                self.endpoint, status
            )));
        }

        response
            .json::<ChessResponse>()
            .await
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }
}
