//! Integration tests for event ingress.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use sentient_core::event::EventType;
use sentient_infrastructure::InMemoryEventBus;
use sentient_orchestrator::application::query_handlers::OrchestratorStatusView;
use serde_json::json;

#[tokio::test]
async fn test_posted_event_reaches_bus_subscribers() {
    // Arrange
    let bus = InMemoryEventBus::new(8);
    let mut subscription = bus.subscribe();
    let app = common::build_test_app(Arc::new(bus.clone()), OrchestratorStatusView::default());
    let body = json!({
        "event_id": "5d1c8a0e-2b7f-4a61-9c3e-8f0b6a2d4e17",
        "type": "maglock_released",
        "timestamp": "2026-01-15T10:05:00Z",
        "room_id": "room-1",
        "device_id": "maglock-front",
        "data": { "reason": "fire door test" }
    });

    // Act
    let (status, json) = common::post_json(app, "/api/v1/events", &body).await;

    // Assert
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["event_id"], "5d1c8a0e-2b7f-4a61-9c3e-8f0b6a2d4e17");
    let received = subscription.next_event().await.unwrap();
    assert_eq!(received.event_type, EventType::MaglockReleased);
    assert_eq!(received.device_id.as_deref(), Some("maglock-front"));
    assert_eq!(received.data["reason"], "fire door test");
}

#[tokio::test]
async fn test_event_missing_timestamp_returns_400() {
    let bus = InMemoryEventBus::new(8);
    let app = common::build_test_app(Arc::new(bus), OrchestratorStatusView::default());

    let (status, json) = common::post_json(
        app,
        "/api/v1/events",
        &json!({
            "event_id": "5d1c8a0e-2b7f-4a61-9c3e-8f0b6a2d4e17",
            "type": "device_online"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}
