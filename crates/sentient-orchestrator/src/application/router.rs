//! Routes inbound domain events to the category handlers.
//!
//! The router owns every handler and the orchestrator service, so each event
//! runs to completion with exclusive access before the next one is taken off
//! the bus. Categories are checked in a fixed order (safety, device,
//! controller, session, gm); the bus itself is consumed strictly FIFO.

use chrono::Duration;
use sentient_core::event::DomainEvent;
use tracing::{debug, warn};

use crate::application::handlers::{
    ControllerEventHandler, DeviceEventHandler, GmEventHandler, SafetyEventHandler,
    SessionEventHandler,
};
use crate::application::orchestrator::OrchestratorService;
use crate::application::query_handlers::{self, ControllerView, OrchestratorStatusView};
use crate::domain::events::{EventCategory, RoutedEvent};

/// What the router did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Decoded and passed to the category's handler.
    Handled(EventCategory),
    /// Relayed by this service; dropped.
    Echo,
    /// Outside every category; dropped.
    Unrouted,
    /// In a category but missing required fields; dropped.
    Rejected(EventCategory),
}

/// The single consumer of the domain-event bus.
#[derive(Debug)]
pub struct EventRouter {
    orchestrator: OrchestratorService,
    safety: SafetyEventHandler,
    device: DeviceEventHandler,
    controller: ControllerEventHandler,
    session: SessionEventHandler,
    gm: GmEventHandler,
}

impl EventRouter {
    /// Wires the handlers around `orchestrator`, sharing its clock.
    #[must_use]
    pub fn new(orchestrator: OrchestratorService) -> Self {
        let clock = orchestrator.clock();
        Self {
            safety: SafetyEventHandler::new(clock.clone()),
            device: DeviceEventHandler,
            controller: ControllerEventHandler::new(clock),
            session: SessionEventHandler,
            gm: GmEventHandler,
            orchestrator,
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> &OrchestratorService {
        &self.orchestrator
    }

    #[must_use]
    pub fn safety(&self) -> &SafetyEventHandler {
        &self.safety
    }

    #[must_use]
    pub fn controllers(&self) -> &ControllerEventHandler {
        &self.controller
    }

    /// Classifies, decodes, and handles one event.
    pub async fn dispatch(&mut self, event: &DomainEvent) -> DispatchOutcome {
        debug!(event_type = %event.event_type, event_id = %event.event_id, "received domain event");

        if event.emitted_by.as_deref() == Some(self.orchestrator.origin()) {
            debug!(event_type = %event.event_type, event_id = %event.event_id, "skipping own event");
            return DispatchOutcome::Echo;
        }

        let Some(category) = EventCategory::classify(event.event_type) else {
            debug!(event_type = %event.event_type, event_id = %event.event_id, "unhandled event type");
            return DispatchOutcome::Unrouted;
        };

        let routed = match RoutedEvent::decode(category, event) {
            Ok(routed) => routed,
            Err(e) => {
                warn!(
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    category = category.as_str(),
                    error = %e,
                    "rejected malformed event"
                );
                return DispatchOutcome::Rejected(category);
            }
        };

        match routed {
            RoutedEvent::Safety(e) => self.safety.handle(e, &mut self.orchestrator).await,
            RoutedEvent::Device(e) => self.device.handle(e, &mut self.orchestrator).await,
            RoutedEvent::Controller(e) => self.controller.handle(e),
            RoutedEvent::Session(e) => self.session.handle(e, &mut self.orchestrator).await,
            RoutedEvent::Gm(e) => self.gm.handle(e, &mut self.orchestrator).await,
        }
        DispatchOutcome::Handled(category)
    }

    /// Runs the controller staleness sweep.
    pub fn sweep_stale_controllers(&mut self, timeout: Duration) -> Vec<String> {
        let stale = self.controller.check_stale_controllers(timeout);
        if !stale.is_empty() {
            warn!(count = stale.len(), stale = ?stale, "stale controllers detected");
        }
        stale
    }

    /// Retries relaying events left staged by a failed publish.
    pub async fn flush_pending(&mut self) {
        if let Err(e) = self.orchestrator.flush_pending().await {
            warn!(error = %e, "pending event relay still failing");
        }
    }

    #[must_use]
    pub fn status_view(&self) -> OrchestratorStatusView {
        query_handlers::status_view(&self.orchestrator, &self.controller, &self.safety)
    }

    #[must_use]
    pub fn controller_view(&self, controller_id: &str) -> ControllerView {
        query_handlers::controller_view(&self.controller, controller_id)
    }
}
