//! Device state and connectivity events.

use tracing::{debug, error, info, warn};

use crate::application::orchestrator::OrchestratorService;
use crate::domain::events::DeviceEvent;

/// Feeds device state changes to puzzle evaluation and logs connectivity.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceEventHandler;

impl DeviceEventHandler {
    /// Applies one device event. Failures are logged, never returned.
    pub async fn handle(&self, event: DeviceEvent, orchestrator: &mut OrchestratorService) {
        match event {
            DeviceEvent::StateChanged(change) => {
                debug!(
                    device_id = %change.device_id,
                    controller_id = ?change.controller_id,
                    room_id = ?change.room_id,
                    "handling device state change"
                );
                if let Err(e) = orchestrator.handle_device_state_change(&change).await {
                    error!(device_id = %change.device_id, room_id = ?change.room_id, error = %e, "failed to handle device event");
                }
            }
            DeviceEvent::Online {
                device_id,
                controller_id,
                room_id,
            } => {
                info!(device_id = %device_id, controller_id = ?controller_id, room_id = ?room_id, "device online");
            }
            DeviceEvent::Offline {
                device_id,
                controller_id,
                room_id,
            } => {
                warn!(device_id = %device_id, controller_id = ?controller_id, room_id = ?room_id, "device offline");
            }
            DeviceEvent::Error {
                device_id,
                controller_id,
                room_id,
                data,
            } => {
                error!(
                    device_id = %device_id,
                    controller_id = ?controller_id,
                    room_id = ?room_id,
                    error_code = ?data.error_code,
                    error_message = %data.error_message,
                    "device error"
                );
            }
        }
    }
}
