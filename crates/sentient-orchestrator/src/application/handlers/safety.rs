//! Safety events: emergency stops, maglock releases, and safety alerts.
//!
//! Safety state is updated before any session is touched, and pausing a
//! session is best effort: a failed pause is logged and the safety state
//! stands. Clearing an emergency stop never resumes a session.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sentient_core::clock::Clock;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::application::orchestrator::OrchestratorService;
use crate::domain::events::{AlertSeverity, SafetyEvent};

const EMERGENCY_STOP_INITIATOR: &str = "EMERGENCY_STOP";
const SAFETY_SYSTEM_INITIATOR: &str = "SAFETY_SYSTEM";

/// Audit record of a released maglock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaglockRelease {
    pub room_id: String,
    pub released_at: DateTime<Utc>,
    pub reason: String,
}

/// Tracks rooms in emergency stop and released maglocks.
pub struct SafetyEventHandler {
    emergency_stop_rooms: BTreeSet<String>,
    released_maglocks: BTreeMap<String, MaglockRelease>,
    clock: Arc<dyn Clock>,
}

impl SafetyEventHandler {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            emergency_stop_rooms: BTreeSet::new(),
            released_maglocks: BTreeMap::new(),
            clock,
        }
    }

    #[must_use]
    pub fn is_room_in_emergency_stop(&self, room_id: &str) -> bool {
        self.emergency_stop_rooms.contains(room_id)
    }

    /// Rooms currently in emergency stop, sorted.
    #[must_use]
    pub fn rooms_in_emergency_stop(&self) -> Vec<String> {
        self.emergency_stop_rooms.iter().cloned().collect()
    }

    /// Last release recorded for a maglock device.
    #[must_use]
    pub fn maglock_status(&self, device_id: &str) -> Option<&MaglockRelease> {
        self.released_maglocks.get(device_id)
    }

    /// Every recorded maglock release, keyed by device id.
    #[must_use]
    pub fn maglock_releases(&self) -> &BTreeMap<String, MaglockRelease> {
        &self.released_maglocks
    }

    /// Applies one safety event. Failures are logged, never returned.
    pub async fn handle(&mut self, event: SafetyEvent, orchestrator: &mut OrchestratorService) {
        match event {
            SafetyEvent::EmergencyStopTriggered {
                room_id,
                session_id,
                data,
            } => {
                self.emergency_stop_rooms.insert(room_id.clone());
                warn!(
                    room_id = %room_id,
                    session_id = ?session_id,
                    triggered_by = ?data.triggered_by,
                    trigger_source = ?data.trigger_source,
                    reason = ?data.reason,
                    "EMERGENCY STOP TRIGGERED"
                );

                let Some(session_id) = session_id else {
                    return;
                };
                let initiated_by = data
                    .triggered_by
                    .as_deref()
                    .unwrap_or(EMERGENCY_STOP_INITIATOR);
                let reason = format!(
                    "Emergency stop: {}",
                    data.reason.as_deref().unwrap_or("No reason provided")
                );
                match orchestrator
                    .pause_session(&session_id, initiated_by, Some(&reason))
                    .await
                {
                    Ok(()) => {
                        info!(session_id = %session_id, room_id = %room_id, "session paused due to emergency stop");
                    }
                    Err(e) => {
                        error!(session_id = %session_id, room_id = %room_id, error = %e, "failed to pause session during emergency stop");
                    }
                }
            }
            SafetyEvent::EmergencyStopCleared {
                room_id,
                session_id,
                data,
            } => {
                self.emergency_stop_rooms.remove(&room_id);
                info!(
                    room_id = %room_id,
                    session_id = ?session_id,
                    cleared_by = %data.cleared_by,
                    "emergency stop cleared; sessions stay paused until resumed"
                );
            }
            SafetyEvent::MaglockReleased {
                device_id,
                controller_id,
                room_id,
                session_id,
                data,
            } => {
                info!(
                    device_id = %device_id,
                    controller_id = ?controller_id,
                    room_id = %room_id,
                    session_id = ?session_id,
                    reason = %data.reason,
                    initiated_by = ?data.initiated_by,
                    "maglock released"
                );
                self.released_maglocks.insert(
                    device_id,
                    MaglockRelease {
                        room_id,
                        released_at: self.clock.now(),
                        reason: data.reason,
                    },
                );
            }
            SafetyEvent::SafetyAlert {
                room_id,
                session_id,
                data,
            } => {
                if data.severity != AlertSeverity::Critical {
                    warn!(
                        room_id = %room_id,
                        session_id = ?session_id,
                        severity = ?data.severity,
                        alert_type = %data.alert_type,
                        message = %data.message,
                        source = ?data.source,
                        "safety alert"
                    );
                    return;
                }

                error!(
                    room_id = %room_id,
                    session_id = ?session_id,
                    alert_type = %data.alert_type,
                    message = %data.message,
                    source = ?data.source,
                    "CRITICAL SAFETY ALERT"
                );
                let Some(session_id) = session_id else {
                    return;
                };
                let reason = format!("Critical safety alert: {}", data.alert_type);
                if let Err(e) = orchestrator
                    .pause_session(&session_id, SAFETY_SYSTEM_INITIATOR, Some(&reason))
                    .await
                {
                    error!(session_id = %session_id, error = %e, "failed to pause session for critical alert");
                }
            }
        }
    }
}

impl std::fmt::Debug for SafetyEventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyEventHandler")
            .field("emergency_stop_rooms", &self.emergency_stop_rooms)
            .field("released_maglocks", &self.released_maglocks)
            .finish_non_exhaustive()
    }
}
