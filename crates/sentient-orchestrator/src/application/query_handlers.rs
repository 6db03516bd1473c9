//! Read-only views of the orchestrator's volatile state.
//!
//! The service's status endpoint serves these DTOs; they are rebuilt after
//! every dispatched event and every staleness sweep.

use chrono::{DateTime, Utc};
use sentient_core::aggregate::AggregateRoot;
use serde::Serialize;

use crate::application::handlers::{ControllerEventHandler, MaglockRelease, SafetyEventHandler};
use crate::application::orchestrator::OrchestratorService;
use crate::domain::aggregates::GameSessionStatus;

/// A cached game session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSessionView {
    pub session_id: String,
    pub room_id: String,
    pub status: GameSessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub hints_used: u32,
    pub current_scene_id: Option<String>,
    /// Staged events not yet relayed to the bus.
    pub pending_events: usize,
}

/// Health of one controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerView {
    pub controller_id: String,
    /// `online`, `offline`, `error`, or `unknown`.
    pub status: String,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// A released maglock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaglockReleaseView {
    pub device_id: String,
    #[serde(flatten)]
    pub release: MaglockRelease,
}

/// Snapshot of everything the orchestrator tracks in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestratorStatusView {
    pub active_sessions: Vec<ActiveSessionView>,
    pub emergency_stop_rooms: Vec<String>,
    pub controllers: Vec<ControllerView>,
    pub maglock_releases: Vec<MaglockReleaseView>,
}

/// Builds the view of one controller. Controllers never seen report
/// `unknown`.
#[must_use]
pub fn controller_view(controllers: &ControllerEventHandler, controller_id: &str) -> ControllerView {
    ControllerView {
        controller_id: controller_id.to_owned(),
        status: controllers
            .controller_status(controller_id)
            .map_or_else(|| "unknown".to_owned(), |s| s.to_string()),
        last_heartbeat: controllers.tracker().last_heartbeat(controller_id),
    }
}

/// Builds the full status view.
#[must_use]
pub fn status_view(
    orchestrator: &OrchestratorService,
    controllers: &ControllerEventHandler,
    safety: &SafetyEventHandler,
) -> OrchestratorStatusView {
    let mut active_sessions: Vec<ActiveSessionView> = orchestrator
        .active_sessions()
        .map(|aggregate| ActiveSessionView {
            session_id: aggregate.id().to_owned(),
            room_id: aggregate.room_id().to_owned(),
            status: aggregate.status(),
            started_at: aggregate.session().started_at,
            hints_used: aggregate.session().hints_used,
            current_scene_id: aggregate.current_scene_id().map(str::to_owned),
            pending_events: aggregate.uncommitted_events().len(),
        })
        .collect();
    active_sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));

    OrchestratorStatusView {
        active_sessions,
        emergency_stop_rooms: safety.rooms_in_emergency_stop(),
        controllers: controllers
            .tracker()
            .statuses()
            .map(|(id, _)| controller_view(controllers, id))
            .collect(),
        maglock_releases: safety
            .maglock_releases()
            .iter()
            .map(|(device_id, release)| MaglockReleaseView {
                device_id: device_id.clone(),
                release: release.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::application::handlers::fixtures::{harness_with_running, t0};
    use crate::domain::events::ControllerEvent;

    #[tokio::test]
    async fn test_status_view_lists_sessions_and_controllers() {
        // Arrange
        let h = harness_with_running("s-1").await;
        let mut controllers = ControllerEventHandler::new(h.clock.clone());
        controllers.handle(ControllerEvent::Online {
            controller_id: "ctrl-1".to_owned(),
            room_id: Some("room-1".to_owned()),
        });
        let safety = SafetyEventHandler::new(h.clock.clone());

        // Act
        let view = status_view(&h.orchestrator, &controllers, &safety);

        // Assert
        assert_eq!(view.active_sessions.len(), 1);
        assert_eq!(view.active_sessions[0].session_id, "s-1");
        assert_eq!(view.active_sessions[0].status, GameSessionStatus::Running);
        assert_eq!(view.active_sessions[0].pending_events, 0);
        assert_eq!(
            view.controllers,
            vec![ControllerView {
                controller_id: "ctrl-1".to_owned(),
                status: "online".to_owned(),
                last_heartbeat: Some(t0()),
            }]
        );
        assert!(view.emergency_stop_rooms.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_controller_reports_unknown() {
        let h = harness_with_running("s-1").await;
        let controllers = ControllerEventHandler::new(h.clock.clone());

        let view = controller_view(&controllers, "ctrl-x");

        assert_eq!(view.status, "unknown");
        assert!(view.last_heartbeat.is_none());
    }
}
