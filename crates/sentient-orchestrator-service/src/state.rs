//! Shared application state.

use std::sync::Arc;

use sentient_core::publisher::EventPublisher;
use sentient_orchestrator::application::query_handlers::OrchestratorStatusView;
use tokio::sync::watch;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Name this service stamps on relayed events.
    pub service_name: String,
    /// Ingress onto the domain-event bus.
    pub publisher: Arc<dyn EventPublisher>,
    /// Latest status published by the consumer loop.
    pub status: watch::Receiver<OrchestratorStatusView>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        service_name: impl Into<String>,
        publisher: Arc<dyn EventPublisher>,
        status: watch::Receiver<OrchestratorStatusView>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            publisher,
            status,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}
