//! Shared test helpers for service integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use sentient_core::publisher::EventPublisher;
use sentient_infrastructure::InMemoryEventBus;
use sentient_orchestrator::application::query_handlers::OrchestratorStatusView;
use sentient_orchestrator::infrastructure::InMemorySessionRepository;
use sentient_orchestrator::{EventRouter, OrchestratorService};
use sentient_orchestrator_service::runtime::{OrchestratorRuntime, status_channel};
use sentient_orchestrator_service::state::AppState;
use sentient_test_support::{ManualClock, RecordingEventPublisher};
use tokio::sync::{oneshot, watch};
use tower::ServiceExt;

pub const SERVICE_NAME: &str = "orchestrator-service";

/// Fixed timestamp used across all integration tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// Build a router over an in-memory orchestrator driven by a manual clock.
pub fn event_router() -> (EventRouter, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let orchestrator = OrchestratorService::new(
        Arc::new(InMemorySessionRepository::new()),
        Arc::new(RecordingEventPublisher::new()),
        clock.clone(),
        SERVICE_NAME,
    );
    (EventRouter::new(orchestrator), clock)
}

/// Build the HTTP app serving a fixed status view.
pub fn build_test_app(publisher: Arc<dyn EventPublisher>, status: OrchestratorStatusView) -> Router {
    let (_tx, rx) = watch::channel(status);
    sentient_orchestrator_service::app(AppState::new(SERVICE_NAME, publisher, rx))
}

/// A running consumer loop wired to the HTTP app through a real bus.
pub struct LiveService {
    pub app: Router,
    pub status: watch::Receiver<OrchestratorStatusView>,
    pub stop: oneshot::Sender<()>,
}

/// Spawn the consumer loop and build an app publishing onto its bus.
pub fn spawn_live_service() -> LiveService {
    let bus = InMemoryEventBus::new(64);
    let orchestrator = OrchestratorService::new(
        Arc::new(InMemorySessionRepository::new()),
        Arc::new(bus.clone()),
        Arc::new(ManualClock::new(t0())),
        SERVICE_NAME,
    );
    let router = EventRouter::new(orchestrator);
    let (tx, status) = status_channel(&router);
    let runtime = OrchestratorRuntime::new(
        router,
        bus.subscribe(),
        tx,
        chrono::Duration::milliseconds(90_000),
        Duration::from_secs(60),
    );
    let (stop, stopped) = oneshot::channel();
    tokio::spawn(runtime.run(async {
        let _ = stopped.await;
    }));

    let app = sentient_orchestrator_service::app(AppState::new(SERVICE_NAME, Arc::new(bus), status.clone()));
    LiveService { app, status, stop }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
