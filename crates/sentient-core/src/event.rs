//! Domain event envelope and type catalogue.
//!
//! Every message on the shared bus is a [`DomainEvent`]: a fresh event id, a
//! closed [`EventType`], a timestamp, optional correlation ids, and a
//! type-specific `data` payload. Category-level typing happens in the
//! orchestrator's router; this module only knows the envelope.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DomainError;

/// The closed catalogue of domain event types carried on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Device
    DeviceStateChanged,
    DeviceOnline,
    DeviceOffline,
    DeviceError,

    // Controller
    ControllerRegistered,
    ControllerOnline,
    ControllerOffline,
    ControllerHeartbeat,
    ControllerError,

    // Puzzle
    PuzzleStarted,
    PuzzleProgress,
    PuzzleSolved,
    PuzzleFailed,
    PuzzleReset,
    PuzzleSkipped,

    // Scene
    SceneStarted,
    SceneAdvanced,
    SceneCompleted,

    // Session
    SessionCreated,
    SessionStarted,
    SessionPaused,
    SessionResumed,
    SessionCompleted,
    SessionAbandoned,

    // Game master
    HintUsed,
    ManualOverride,
    GmCommand,

    // Safety
    EmergencyStopTriggered,
    EmergencyStopCleared,
    MaglockReleased,
    SafetyAlert,

    // Audio
    AudioCuePlay,
    AudioCueStop,
    AudioHotkeyPlay,
    AudioHotkeyOn,
    AudioHotkeyOff,
    AudioStopAll,
    AudioFadeAll,
    AudioSetMasterVolume,
}

impl EventType {
    /// Every event type, in catalogue order.
    pub const ALL: [EventType; 39] = [
        Self::DeviceStateChanged,
        Self::DeviceOnline,
        Self::DeviceOffline,
        Self::DeviceError,
        Self::ControllerRegistered,
        Self::ControllerOnline,
        Self::ControllerOffline,
        Self::ControllerHeartbeat,
        Self::ControllerError,
        Self::PuzzleStarted,
        Self::PuzzleProgress,
        Self::PuzzleSolved,
        Self::PuzzleFailed,
        Self::PuzzleReset,
        Self::PuzzleSkipped,
        Self::SceneStarted,
        Self::SceneAdvanced,
        Self::SceneCompleted,
        Self::SessionCreated,
        Self::SessionStarted,
        Self::SessionPaused,
        Self::SessionResumed,
        Self::SessionCompleted,
        Self::SessionAbandoned,
        Self::HintUsed,
        Self::ManualOverride,
        Self::GmCommand,
        Self::EmergencyStopTriggered,
        Self::EmergencyStopCleared,
        Self::MaglockReleased,
        Self::SafetyAlert,
        Self::AudioCuePlay,
        Self::AudioCueStop,
        Self::AudioHotkeyPlay,
        Self::AudioHotkeyOn,
        Self::AudioHotkeyOff,
        Self::AudioStopAll,
        Self::AudioFadeAll,
        Self::AudioSetMasterVolume,
    ];

    /// Returns the wire name of this event type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceStateChanged => "device_state_changed",
            Self::DeviceOnline => "device_online",
            Self::DeviceOffline => "device_offline",
            Self::DeviceError => "device_error",
            Self::ControllerRegistered => "controller_registered",
            Self::ControllerOnline => "controller_online",
            Self::ControllerOffline => "controller_offline",
            Self::ControllerHeartbeat => "controller_heartbeat",
            Self::ControllerError => "controller_error",
            Self::PuzzleStarted => "puzzle_started",
            Self::PuzzleProgress => "puzzle_progress",
            Self::PuzzleSolved => "puzzle_solved",
            Self::PuzzleFailed => "puzzle_failed",
            Self::PuzzleReset => "puzzle_reset",
            Self::PuzzleSkipped => "puzzle_skipped",
            Self::SceneStarted => "scene_started",
            Self::SceneAdvanced => "scene_advanced",
            Self::SceneCompleted => "scene_completed",
            Self::SessionCreated => "session_created",
            Self::SessionStarted => "session_started",
            Self::SessionPaused => "session_paused",
            Self::SessionResumed => "session_resumed",
            Self::SessionCompleted => "session_completed",
            Self::SessionAbandoned => "session_abandoned",
            Self::HintUsed => "hint_used",
            Self::ManualOverride => "manual_override",
            Self::GmCommand => "gm_command",
            Self::EmergencyStopTriggered => "emergency_stop_triggered",
            Self::EmergencyStopCleared => "emergency_stop_cleared",
            Self::MaglockReleased => "maglock_released",
            Self::SafetyAlert => "safety_alert",
            Self::AudioCuePlay => "audio_cue_play",
            Self::AudioCueStop => "audio_cue_stop",
            Self::AudioHotkeyPlay => "audio_hotkey_play",
            Self::AudioHotkeyOn => "audio_hotkey_on",
            Self::AudioHotkeyOff => "audio_hotkey_off",
            Self::AudioStopAll => "audio_stop_all",
            Self::AudioFadeAll => "audio_fade_all",
            Self::AudioSetMasterVolume => "audio_set_master_volume",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn empty_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A domain event as carried on the shared bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique identifier, fresh per emission.
    pub event_id: Uuid,
    /// Event type tag.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// Correlated game session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Correlated room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// Correlated hardware controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<String>,
    /// Correlated device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Correlated puzzle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_id: Option<String>,
    /// Correlated scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    /// Name of the service that relayed this event, if it was relayed by one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emitted_by: Option<String>,
    /// Type-specific payload.
    #[serde(default = "empty_payload")]
    pub data: Value,
}

impl DomainEvent {
    /// Creates an event with a fresh id, no correlation ids, and an empty
    /// payload.
    #[must_use]
    pub fn new(event_type: EventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp,
            session_id: None,
            room_id: None,
            controller_id: None,
            device_id: None,
            puzzle_id: None,
            scene_id: None,
            emitted_by: None,
            data: empty_payload(),
        }
    }

    /// Sets the session id.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the room id.
    #[must_use]
    pub fn with_room_id(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    /// Sets the controller id.
    #[must_use]
    pub fn with_controller_id(mut self, controller_id: impl Into<String>) -> Self {
        self.controller_id = Some(controller_id.into());
        self
    }

    /// Sets the device id.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Sets the puzzle id.
    #[must_use]
    pub fn with_puzzle_id(mut self, puzzle_id: impl Into<String>) -> Self {
        self.puzzle_id = Some(puzzle_id.into());
        self
    }

    /// Sets the scene id.
    #[must_use]
    pub fn with_scene_id(mut self, scene_id: impl Into<String>) -> Self {
        self.scene_id = Some(scene_id.into());
        self
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Decodes the `data` payload into a typed structure. A `null` payload is
    /// treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the payload does not match `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        let value = if self.data.is_null() {
            empty_payload()
        } else {
            self.data.clone()
        };
        serde_json::from_value(value).map_err(|e| {
            DomainError::Validation(format!("invalid {} payload: {e}", self.event_type))
        })
    }

    /// Returns the session id or a validation error naming the event type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the field is absent.
    pub fn require_session_id(&self) -> Result<&str, DomainError> {
        required(self.event_type, self.session_id.as_deref(), "session_id")
    }

    /// Returns the room id or a validation error naming the event type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the field is absent.
    pub fn require_room_id(&self) -> Result<&str, DomainError> {
        required(self.event_type, self.room_id.as_deref(), "room_id")
    }

    /// Returns the controller id or a validation error naming the event type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the field is absent.
    pub fn require_controller_id(&self) -> Result<&str, DomainError> {
        required(self.event_type, self.controller_id.as_deref(), "controller_id")
    }

    /// Returns the device id or a validation error naming the event type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the field is absent.
    pub fn require_device_id(&self) -> Result<&str, DomainError> {
        required(self.event_type, self.device_id.as_deref(), "device_id")
    }

    /// Parses an event from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the message is not a valid event.
    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw)
            .map_err(|e| DomainError::Validation(format!("malformed domain event: {e}")))
    }

    /// Serializes the event to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Transport` if serialization fails.
    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(self)
            .map_err(|e| DomainError::Transport(format!("event serialization failed: {e}")))
    }
}

fn required<'a>(
    event_type: EventType,
    value: Option<&'a str>,
    field: &str,
) -> Result<&'a str, DomainError> {
    value.ok_or_else(|| DomainError::Validation(format!("{event_type} event requires {field}")))
}
