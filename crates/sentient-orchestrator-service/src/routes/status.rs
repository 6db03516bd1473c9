//! Orchestrator status queries.
//!
//! Both endpoints read the latest view published by the consumer loop; they
//! never touch the router directly.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use sentient_orchestrator::application::query_handlers::{ControllerView, OrchestratorStatusView};
use tracing::instrument;

use crate::state::AppState;

/// GET /status
async fn get_status(State(state): State<AppState>) -> Json<OrchestratorStatusView> {
    Json(state.status.borrow().clone())
}

/// GET /controllers/{controller_id}
#[instrument(skip(state))]
async fn get_controller(
    State(state): State<AppState>,
    Path(controller_id): Path<String>,
) -> Json<ControllerView> {
    let view = state
        .status
        .borrow()
        .controllers
        .iter()
        .find(|c| c.controller_id == controller_id)
        .cloned()
        .unwrap_or(ControllerView {
            controller_id,
            status: "unknown".to_owned(),
            last_heartbeat: None,
        });
    Json(view)
}

/// Returns the router for status queries.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/controllers/{controller_id}", get(get_controller))
}
