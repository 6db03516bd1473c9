//! Sentient orchestrator service: the bus consumer loop plus its operational
//! HTTP surface.

use axum::Router;

pub mod config;
pub mod error;
pub mod routes;
pub mod runtime;
pub mod state;

use state::AppState;

/// Builds the HTTP router. `main` adds the tracing and CORS layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1",
            Router::new()
                .merge(routes::events::router())
                .merge(routes::status::router()),
        )
        .with_state(state)
}
