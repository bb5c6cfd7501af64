pub mod error;
pub mod routes;
pub mod state;
pub mod transport;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::chess::routes())
        .merge(routes::games::routes())
        .merge(routes::tournaments::routes())
        .layer(cors)
        .with_state(state)
}
