//! Domain-event ingress.
//!
//! Lets adapters without a bus connection (test benches, the GM console
//! backend) put an event onto the shared channel. The body is validated as a
//! full domain event before it is published.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use sentient_core::event::{DomainEvent, EventType};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for an accepted event.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    /// ID of the published event.
    pub event_id: Uuid,
    /// Its type.
    #[serde(rename = "type")]
    pub event_type: EventType,
}

/// POST /events
#[instrument(skip(state, body))]
async fn publish_event(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let event = DomainEvent::from_json(&body)?;

    state.publisher.publish(&event).await?;
    info!(event_type = %event.event_type, event_id = %event.event_id, "accepted domain event");

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            event_id: event.event_id,
            event_type: event.event_type,
        }),
    ))
}

/// Returns the router for event ingress.
pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(publish_event))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use sentient_core::publisher::EventPublisher;
    use sentient_orchestrator::application::query_handlers::OrchestratorStatusView;
    use sentient_test_support::{FailingEventPublisher, RecordingEventPublisher};
    use serde_json::{Value, json};
    use tokio::sync::watch;
    use tower::ServiceExt;

    fn app_state_with(publisher: Arc<dyn EventPublisher>) -> AppState {
        let (_tx, status) = watch::channel(OrchestratorStatusView::default());
        AppState::new("orchestrator-service", publisher, status)
    }

    fn post(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/events")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn heartbeat() -> Value {
        json!({
            "event_id": "0e9b6f0c-7a51-4a38-9f1f-3d5c2b8e4a10",
            "type": "controller_heartbeat",
            "timestamp": "2026-01-15T10:00:00Z",
            "controller_id": "ctrl-1",
            "data": { "uptime_seconds": 42 }
        })
    }

    #[tokio::test]
    async fn test_valid_event_returns_202_and_is_published() {
        // Arrange
        let publisher = Arc::new(RecordingEventPublisher::new());
        let app = router().with_state(app_state_with(publisher.clone()));

        // Act
        let response = app.oneshot(post(heartbeat().to_string())).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = json_body(response).await;
        assert_eq!(json["event_id"], "0e9b6f0c-7a51-4a38-9f1f-3d5c2b8e4a10");
        assert_eq!(json["type"], "controller_heartbeat");
        assert_eq!(publisher.published_types(), vec![EventType::ControllerHeartbeat]);
    }

    #[tokio::test]
    async fn test_unknown_event_type_returns_400() {
        let publisher = Arc::new(RecordingEventPublisher::new());
        let app = router().with_state(app_state_with(publisher.clone()));
        let mut body = heartbeat();
        body["type"] = json!("teleport_requested");

        let response = app.oneshot(post(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "validation_error");
        assert!(publisher.published_events().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_returns_400() {
        let app = router().with_state(app_state_with(Arc::new(RecordingEventPublisher::new())));

        let response = app.oneshot(post("not json".to_owned())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bus_failure_returns_503() {
        let app = router().with_state(app_state_with(Arc::new(FailingEventPublisher)));

        let response = app.oneshot(post(heartbeat().to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["error"], "transport_error");
    }
}
