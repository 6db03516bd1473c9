//! Game-master actions: hints, manual overrides, and console commands.
//!
//! Only puzzle skips, pause, resume, and ending the game change session
//! state. The remaining overrides and commands are accepted and logged.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::application::orchestrator::OrchestratorService;
use crate::domain::events::{GmCommandData, GmEvent, ManualOverrideData};

const GM_COMMAND_REASON: &str = "GM Command";

/// Applies operator actions to the orchestrator.
#[derive(Debug, Default, Clone, Copy)]
pub struct GmEventHandler;

impl GmEventHandler {
    /// Applies one GM event. Failures are logged, never returned.
    pub async fn handle(&self, event: GmEvent, orchestrator: &mut OrchestratorService) {
        match event {
            GmEvent::HintUsed {
                session_id,
                room_id,
                data,
            } => {
                info!(
                    session_id = %session_id,
                    room_id = ?room_id,
                    hint_number = ?data.hint_number,
                    delivered_by = ?data.delivered_by,
                    initiated_by = ?data.initiated_by,
                    "hint delivered"
                );
                if let Err(e) = orchestrator.use_hint(&session_id).await {
                    error!(session_id = %session_id, room_id = ?room_id, error = %e, "failed to record hint usage");
                }
            }
            GmEvent::ManualOverride {
                session_id,
                room_id,
                data,
            } => {
                info!(
                    session_id = ?session_id,
                    room_id = ?room_id,
                    target_type = %data.target_type,
                    target_id = %data.target_id,
                    action = %data.action,
                    initiated_by = %data.initiated_by,
                    reason = ?data.reason,
                    "manual override executed"
                );
                override_target(session_id.as_deref(), room_id.as_deref(), &data, orchestrator).await;
            }
            GmEvent::Command {
                session_id,
                room_id,
                data,
            } => {
                info!(
                    session_id = ?session_id,
                    room_id = ?room_id,
                    command = %data.command,
                    initiated_by = %data.initiated_by,
                    "GM command received"
                );
                command(session_id.as_deref(), room_id.as_deref(), &data, orchestrator).await;
            }
        }
    }
}

async fn override_target(
    session_id: Option<&str>,
    room_id: Option<&str>,
    data: &ManualOverrideData,
    orchestrator: &mut OrchestratorService,
) {
    match data.target_type.as_str() {
        "puzzle" => {
            let Some(session_id) = session_id else {
                warn!(puzzle_id = %data.target_id, "puzzle override requires session_id");
                return;
            };
            match data.action.as_str() {
                "skip" | "solve" => {
                    match orchestrator
                        .skip_puzzle(session_id, &data.target_id, &data.initiated_by)
                        .await
                    {
                        Ok(()) => {
                            info!(session_id, puzzle_id = %data.target_id, initiated_by = %data.initiated_by, "puzzle skipped via manual override");
                        }
                        Err(e) => {
                            error!(session_id, puzzle_id = %data.target_id, error = %e, "failed to skip puzzle");
                        }
                    }
                }
                "reset" => {
                    info!(session_id, puzzle_id = %data.target_id, "puzzle reset requested");
                }
                other => {
                    warn!(session_id, puzzle_id = %data.target_id, action = other, "unknown puzzle override action");
                }
            }
        }
        "device" => {
            info!(
                room_id,
                device_id = %data.target_id,
                action = %data.action,
                parameters = ?data.parameters,
                "device override requested"
            );
        }
        "scene" => {
            info!(session_id, scene_id = %data.target_id, action = %data.action, "scene override requested");
        }
        "effect" => {
            info!(
                room_id,
                effect_id = %data.target_id,
                action = %data.action,
                parameters = ?data.parameters,
                "effect override requested"
            );
        }
        other => {
            warn!(target_type = other, "unknown override target type");
        }
    }
}

fn parameter<'a>(data: &'a GmCommandData, key: &str) -> Option<&'a Value> {
    data.parameters.as_ref()?.get(key)
}

async fn command(
    session_id: Option<&str>,
    room_id: Option<&str>,
    data: &GmCommandData,
    orchestrator: &mut OrchestratorService,
) {
    match data.command.as_str() {
        "pause" => {
            let Some(session_id) = session_id else {
                return;
            };
            if let Err(e) = orchestrator
                .pause_session(session_id, &data.initiated_by, Some(GM_COMMAND_REASON))
                .await
            {
                error!(session_id, error = %e, "failed to pause session");
            }
        }
        "resume" => {
            let Some(session_id) = session_id else {
                return;
            };
            if let Err(e) = orchestrator
                .resume_session(session_id, &data.initiated_by)
                .await
            {
                error!(session_id, error = %e, "failed to resume session");
            }
        }
        "end_game" => {
            let Some(session_id) = session_id else {
                return;
            };
            let success = parameter(data, "success")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if let Err(e) = orchestrator.complete_session(session_id, success).await {
                error!(session_id, error = %e, "failed to end game");
            }
        }
        "add_time" => {
            info!(session_id, minutes = ?parameter(data, "minutes"), "add time requested");
        }
        "subtract_time" => {
            info!(session_id, minutes = ?parameter(data, "minutes"), "subtract time requested");
        }
        "reset_room" => {
            info!(room_id, "room reset requested");
        }
        other => {
            warn!(command = other, "unknown GM command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentient_core::aggregate::AggregateRoot;
    use sentient_core::event::EventType;
    use serde_json::json;

    use crate::application::handlers::fixtures::{
        harness_with_puzzle_in_progress, harness_with_running,
    };
    use crate::domain::aggregates::{GameSessionStatus, PuzzleStatus};
    use crate::domain::events::{HintUsedData, PuzzleSkippedData, SessionPausedData};

    fn gm_command(session_id: &str, command: &str, parameters: Option<Value>) -> GmEvent {
        GmEvent::Command {
            session_id: Some(session_id.to_owned()),
            room_id: Some("room-1".to_owned()),
            data: GmCommandData {
                command: command.to_owned(),
                parameters: parameters.and_then(|p| p.as_object().cloned()),
                initiated_by: "gm-ana".to_owned(),
            },
        }
    }

    fn override_of(
        session_id: Option<&str>,
        target_type: &str,
        target_id: &str,
        action: &str,
    ) -> GmEvent {
        GmEvent::ManualOverride {
            session_id: session_id.map(str::to_owned),
            room_id: Some("room-1".to_owned()),
            data: ManualOverrideData {
                target_type: target_type.to_owned(),
                target_id: target_id.to_owned(),
                action: action.to_owned(),
                parameters: None,
                initiated_by: "gm-ana".to_owned(),
                reason: None,
            },
        }
    }

    fn puzzle_override(session_id: Option<&str>, action: &str) -> GmEvent {
        override_of(session_id, "puzzle", "p-safe", action)
    }

    #[tokio::test]
    async fn test_end_game_with_success_completes_session() {
        // Arrange
        let mut h = harness_with_running("s-1").await;

        // Act
        GmEventHandler
            .handle(
                gm_command("s-1", "end_game", Some(json!({ "success": true }))),
                &mut h.orchestrator,
            )
            .await;

        // Assert
        let completed = h.publisher.published_events().pop().unwrap();
        assert_eq!(completed.event_type, EventType::SessionCompleted);
        assert_eq!(completed.data["completed"], true);
        assert!(h.orchestrator.active_session("s-1").is_none());
    }

    #[tokio::test]
    async fn test_end_game_without_parameters_is_unsuccessful() {
        let mut h = harness_with_running("s-1").await;

        GmEventHandler
            .handle(gm_command("s-1", "end_game", None), &mut h.orchestrator)
            .await;

        let completed = h.publisher.published_events().pop().unwrap();
        assert_eq!(completed.data["completed"], false);
    }

    #[tokio::test]
    async fn test_pause_command_uses_gm_reason() {
        let mut h = harness_with_running("s-1").await;

        GmEventHandler
            .handle(gm_command("s-1", "pause", None), &mut h.orchestrator)
            .await;

        let data: SessionPausedData = h.publisher.published_events().pop().unwrap().payload().unwrap();
        assert_eq!(data.initiated_by, "gm-ana");
        assert_eq!(data.reason.as_deref(), Some("GM Command"));
    }

    #[tokio::test]
    async fn test_placeholder_commands_change_nothing() {
        let mut h = harness_with_running("s-1").await;

        for name in ["add_time", "subtract_time", "reset_room", "teleport"] {
            GmEventHandler
                .handle(gm_command("s-1", name, Some(json!({ "minutes": 5 }))), &mut h.orchestrator)
                .await;
        }

        assert_eq!(h.publisher.published_types(), vec![EventType::SessionStarted]);
        assert_eq!(
            h.orchestrator.active_session("s-1").unwrap().status(),
            GameSessionStatus::Running
        );
    }

    #[tokio::test]
    async fn test_hint_used_increments_session_hints() {
        let mut h = harness_with_running("s-1").await;

        GmEventHandler
            .handle(
                GmEvent::HintUsed {
                    session_id: "s-1".to_owned(),
                    room_id: None,
                    data: HintUsedData {
                        hint_number: Some(1),
                        hint_text: Some("Look under the rug".to_owned()),
                        ..HintUsedData::default()
                    },
                },
                &mut h.orchestrator,
            )
            .await;

        assert_eq!(h.orchestrator.active_session("s-1").unwrap().session().hints_used, 1);
        let hint = h.publisher.published_events().pop().unwrap();
        assert_eq!(hint.event_type, EventType::HintUsed);
        assert_eq!(hint.emitted_by.as_deref(), Some("orchestrator-service"));
    }

    #[tokio::test]
    async fn test_solve_override_on_unstarted_puzzle_is_swallowed() {
        let mut h = harness_with_running("s-1").await;

        GmEventHandler
            .handle(puzzle_override(Some("s-1"), "solve"), &mut h.orchestrator)
            .await;

        assert_eq!(h.publisher.published_types(), vec![EventType::SessionStarted]);
    }

    #[tokio::test]
    async fn test_puzzle_override_without_session_is_ignored() {
        let mut h = harness_with_running("s-1").await;

        GmEventHandler
            .handle(puzzle_override(None, "skip"), &mut h.orchestrator)
            .await;

        assert_eq!(h.publisher.published_events().len(), 1);
    }

    #[tokio::test]
    async fn test_skip_and_solve_overrides_skip_in_progress_puzzle() {
        for action in ["skip", "solve"] {
            // Arrange
            let mut h = harness_with_puzzle_in_progress("s-1", "p-safe").await;

            // Act
            GmEventHandler
                .handle(puzzle_override(Some("s-1"), action), &mut h.orchestrator)
                .await;

            // Assert
            let skipped = h.publisher.published_events();
            assert_eq!(skipped.len(), 1, "action {action}");
            assert_eq!(skipped[0].event_type, EventType::PuzzleSkipped);
            assert_eq!(skipped[0].session_id.as_deref(), Some("s-1"));
            assert_eq!(skipped[0].puzzle_id.as_deref(), Some("p-safe"));
            let data: PuzzleSkippedData = skipped[0].payload().unwrap();
            assert_eq!(data.initiated_by, "gm-ana");
            let progress = h
                .orchestrator
                .active_session("s-1")
                .unwrap()
                .puzzle_progress("p-safe")
                .unwrap();
            assert_eq!(progress.status, PuzzleStatus::Skipped);
        }
    }

    #[tokio::test]
    async fn test_reset_and_non_puzzle_overrides_change_nothing() {
        let mut h = harness_with_puzzle_in_progress("s-1", "p-safe").await;

        for event in [
            puzzle_override(Some("s-1"), "reset"),
            override_of(Some("s-1"), "device", "maglock-front", "unlock"),
            override_of(Some("s-1"), "scene", "scene-2", "start"),
            override_of(Some("s-1"), "effect", "fog-machine", "trigger"),
            override_of(Some("s-1"), "lighting", "lamp-1", "on"),
        ] {
            GmEventHandler.handle(event, &mut h.orchestrator).await;
        }

        assert!(h.publisher.published_events().is_empty());
        let session = h.orchestrator.active_session("s-1").unwrap();
        assert_eq!(session.status(), GameSessionStatus::Running);
        assert_eq!(session.in_progress_puzzle_ids(), vec!["p-safe".to_owned()]);
        assert!(session.uncommitted_events().is_empty());
    }
}
