//! Domain event handlers, one per category.
//!
//! Handlers are the single layer that swallows errors: every failure from the
//! orchestrator is logged with the entity it concerned and the loop moves on.

pub mod controller;
pub mod device;
pub mod gm;
pub mod safety;
pub mod session;

pub use controller::ControllerEventHandler;
pub use device::DeviceEventHandler;
pub use gm::GmEventHandler;
pub use safety::{MaglockRelease, SafetyEventHandler};
pub use session::SessionEventHandler;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use sentient_test_support::{ManualClock, RecordingEventPublisher};

    use crate::application::orchestrator::OrchestratorService;
    use crate::domain::aggregates::{GameSession, GameSessionAggregate};
    use crate::domain::events::SessionCreatedData;
    use crate::domain::repository::SessionRepository;
    use crate::infrastructure::InMemorySessionRepository;

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    pub struct Harness {
        pub repo: Arc<InMemorySessionRepository>,
        pub publisher: Arc<RecordingEventPublisher>,
        pub clock: Arc<ManualClock>,
        pub orchestrator: OrchestratorService,
    }

    pub fn harness() -> Harness {
        let publisher = Arc::new(RecordingEventPublisher::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let repo = Arc::new(InMemorySessionRepository::new());
        let orchestrator = OrchestratorService::new(
            repo.clone(),
            publisher.clone(),
            clock.clone(),
            "orchestrator-service",
        );
        Harness {
            repo,
            publisher,
            clock,
            orchestrator,
        }
    }

    /// A harness with `session_id` registered in `room-1` and started.
    pub async fn harness_with_running(session_id: &str) -> Harness {
        let mut h = harness();
        h.orchestrator
            .register_session(session_id, "room-1", SessionCreatedData::default())
            .await
            .unwrap();
        h.orchestrator.start_session(session_id).await.unwrap();
        h
    }

    /// A harness with a running `session_id` in `room-1` whose `puzzle_id` is
    /// in progress, loaded the way a restart would load it.
    pub async fn harness_with_puzzle_in_progress(session_id: &str, puzzle_id: &str) -> Harness {
        let mut h = harness();
        let mut aggregate =
            GameSessionAggregate::new(GameSession::new(session_id, "room-1", t0()));
        aggregate.start(h.clock.as_ref()).unwrap();
        aggregate.start_puzzle(puzzle_id, h.clock.as_ref());
        h.repo.save(&aggregate).await.unwrap();
        h.orchestrator.load_active_sessions("room-1").await.unwrap();
        h
    }
}
