//! Session lifecycle requests arriving from the booking API and GM console.

use tracing::{error, info};

use crate::application::orchestrator::OrchestratorService;
use crate::domain::events::SessionEvent;

/// Turns session lifecycle requests into orchestrator calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionEventHandler;

impl SessionEventHandler {
    /// Applies one session event. Failures are logged, never returned.
    pub async fn handle(&self, event: SessionEvent, orchestrator: &mut OrchestratorService) {
        match event {
            SessionEvent::Created {
                session_id,
                room_id,
                data,
            } => {
                info!(
                    session_id = %session_id,
                    room_id = %room_id,
                    team_name = ?data.team_name,
                    team_size = ?data.team_size,
                    "session created"
                );
                if let Err(e) = orchestrator
                    .register_session(&session_id, &room_id, data)
                    .await
                {
                    error!(session_id = %session_id, room_id = %room_id, error = %e, "failed to register session");
                    return;
                }
                if let Err(e) = orchestrator.load_active_sessions(&room_id).await {
                    error!(session_id = %session_id, room_id = %room_id, error = %e, "failed to load session after creation");
                }
            }
            SessionEvent::Started {
                session_id,
                room_id,
            } => {
                info!(session_id = %session_id, room_id = ?room_id, "session start requested");
                if let Err(e) = orchestrator.start_session(&session_id).await {
                    error!(session_id = %session_id, room_id = ?room_id, error = %e, "failed to start session");
                }
            }
            SessionEvent::Paused {
                session_id,
                room_id,
                data,
            } => {
                info!(
                    session_id = %session_id,
                    room_id = ?room_id,
                    initiated_by = %data.initiated_by,
                    reason = ?data.reason,
                    "session pause requested"
                );
                if let Err(e) = orchestrator
                    .pause_session(&session_id, &data.initiated_by, data.reason.as_deref())
                    .await
                {
                    error!(session_id = %session_id, room_id = ?room_id, error = %e, "failed to pause session");
                }
            }
            SessionEvent::Resumed {
                session_id,
                room_id,
                data,
            } => {
                info!(
                    session_id = %session_id,
                    room_id = ?room_id,
                    initiated_by = %data.initiated_by,
                    "session resume requested"
                );
                if let Err(e) = orchestrator
                    .resume_session(&session_id, &data.initiated_by)
                    .await
                {
                    error!(session_id = %session_id, room_id = ?room_id, error = %e, "failed to resume session");
                }
            }
            SessionEvent::Completed {
                session_id,
                room_id,
                data,
            } => {
                info!(
                    session_id = %session_id,
                    room_id = ?room_id,
                    completed = data.completed,
                    "session completion requested"
                );
                if let Err(e) = orchestrator
                    .complete_session(&session_id, data.completed)
                    .await
                {
                    error!(session_id = %session_id, room_id = ?room_id, error = %e, "failed to complete session");
                }
            }
            SessionEvent::Abandoned {
                session_id,
                room_id,
                data,
            } => {
                info!(
                    session_id = %session_id,
                    room_id = ?room_id,
                    reason = ?data.reason,
                    initiated_by = ?data.initiated_by,
                    "session abandoned"
                );
                if let Err(e) = orchestrator.complete_session(&session_id, false).await {
                    error!(session_id = %session_id, room_id = ?room_id, error = %e, "failed to abandon session");
                }
            }
        }
    }
}
