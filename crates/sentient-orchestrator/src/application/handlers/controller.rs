//! Controller lifecycle and heartbeat events.

use std::sync::Arc;

use chrono::Duration;
use sentient_core::clock::Clock;
use tracing::{debug, error, info, warn};

use crate::application::controller_health::{
    ControllerHealthTracker, ControllerStatus, HeartbeatOutcome,
};
use crate::domain::events::{ControllerEvent, ControllerHeartbeatData};

/// Free memory below this triggers a warning.
const LOW_MEMORY_BYTES: u64 = 1024 * 1024;
/// Board temperature above this triggers a warning.
const HIGH_TEMPERATURE_CELSIUS: f64 = 70.0;

/// Maintains controller health from controller events.
///
/// Heartbeats are stamped with the time they were received, not the time in
/// the event, so a controller with a drifting clock is judged by this
/// service's clock.
pub struct ControllerEventHandler {
    tracker: ControllerHealthTracker,
    clock: Arc<dyn Clock>,
}

impl ControllerEventHandler {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tracker: ControllerHealthTracker::new(),
            clock,
        }
    }

    /// Read access to the health records.
    #[must_use]
    pub fn tracker(&self) -> &ControllerHealthTracker {
        &self.tracker
    }

    /// Status of a controller, `None` if never seen.
    #[must_use]
    pub fn controller_status(&self, controller_id: &str) -> Option<ControllerStatus> {
        self.tracker.status(controller_id)
    }

    /// Ids of online controllers, sorted.
    #[must_use]
    pub fn online_controllers(&self) -> Vec<String> {
        self.tracker.online_controllers()
    }

    /// Flags controllers silent for longer than `timeout`.
    pub fn check_stale_controllers(&mut self, timeout: Duration) -> Vec<String> {
        self.tracker.check_stale(timeout, self.clock.now())
    }

    /// Applies one controller event.
    pub fn handle(&mut self, event: ControllerEvent) {
        let now = self.clock.now();
        match event {
            ControllerEvent::Heartbeat {
                controller_id,
                room_id,
                data,
            } => {
                match self.tracker.record_heartbeat(&controller_id, now) {
                    HeartbeatOutcome::Recovered(previous) => {
                        info!(
                            controller_id = %controller_id,
                            room_id = ?room_id,
                            previous_status = %previous,
                            "controller recovered"
                        );
                    }
                    HeartbeatOutcome::FirstContact => {
                        info!(controller_id = %controller_id, room_id = ?room_id, "controller first seen via heartbeat");
                    }
                    HeartbeatOutcome::Steady => {}
                }
                log_heartbeat(&controller_id, room_id.as_deref(), &data);
            }
            ControllerEvent::Online {
                controller_id,
                room_id,
            } => {
                self.tracker.mark_online(&controller_id, now);
                info!(controller_id = %controller_id, room_id = ?room_id, "controller online");
            }
            ControllerEvent::Registered {
                controller_id,
                room_id,
                data,
            } => {
                self.tracker.mark_online(&controller_id, now);
                info!(
                    controller_id = %controller_id,
                    room_id = ?room_id,
                    controller_type = %data.controller_type,
                    firmware_version = ?data.firmware_version,
                    ip_address = ?data.ip_address,
                    "controller registered"
                );
            }
            ControllerEvent::Offline {
                controller_id,
                room_id,
                data,
            } => {
                self.tracker
                    .set_status(&controller_id, ControllerStatus::Offline);
                warn!(
                    controller_id = %controller_id,
                    room_id = ?room_id,
                    last_seen = ?data.last_seen,
                    reason = ?data.reason,
                    "controller offline"
                );
            }
            ControllerEvent::Error {
                controller_id,
                room_id,
                data,
            } => {
                self.tracker
                    .set_status(&controller_id, ControllerStatus::Error);
                error!(
                    controller_id = %controller_id,
                    room_id = ?room_id,
                    error_code = ?data.error_code,
                    error_message = %data.error_message,
                    "controller error"
                );
            }
        }
    }
}

fn log_heartbeat(controller_id: &str, room_id: Option<&str>, data: &ControllerHeartbeatData) {
    debug!(
        controller_id,
        room_id,
        uptime_seconds = data.uptime_seconds,
        free_memory_bytes = data.free_memory_bytes,
        cpu_usage_percent = data.cpu_usage_percent,
        temperature_celsius = data.temperature_celsius,
        "controller heartbeat received"
    );
    if let Some(free) = data.free_memory_bytes.filter(|free| *free < LOW_MEMORY_BYTES) {
        warn!(controller_id, room_id, free_memory_bytes = free, "controller low memory");
    }
    if let Some(temp) = data
        .temperature_celsius
        .filter(|temp| *temp > HIGH_TEMPERATURE_CELSIUS)
    {
        warn!(controller_id, room_id, temperature_celsius = temp, "controller high temperature");
    }
}

impl std::fmt::Debug for ControllerEventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerEventHandler")
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}
