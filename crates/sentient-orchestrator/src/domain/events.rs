//! Typed domain events for the orchestration engine.
//!
//! The bus carries untyped [`DomainEvent`] envelopes. The router classifies
//! each envelope into an [`EventCategory`] and decodes it into that
//! category's closed union ([`SafetyEvent`], [`DeviceEvent`],
//! [`ControllerEvent`], [`SessionEvent`], [`GmEvent`]), so handlers match
//! exhaustively on typed payloads. The payload structs double as the shapes
//! the aggregate emits.

use chrono::{DateTime, Utc};
use sentient_core::error::DomainError;
use sentient_core::event::{DomainEvent, EventType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- categories ---

/// The five handler categories, in dispatch-precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// Emergency stops, maglocks, safety alerts.
    Safety,
    /// Device state and connectivity.
    Device,
    /// Controller lifecycle and heartbeats.
    Controller,
    /// Game-session lifecycle requests.
    Session,
    /// Game-master hints, overrides, and commands.
    Gm,
}

impl EventCategory {
    /// Categories in the order they are checked during classification.
    pub const PRECEDENCE: [EventCategory; 5] = [
        Self::Safety,
        Self::Device,
        Self::Controller,
        Self::Session,
        Self::Gm,
    ];

    /// The event types that belong to this category.
    #[must_use]
    pub fn event_types(self) -> &'static [EventType] {
        match self {
            Self::Safety => &[
                EventType::EmergencyStopTriggered,
                EventType::EmergencyStopCleared,
                EventType::MaglockReleased,
                EventType::SafetyAlert,
            ],
            Self::Device => &[
                EventType::DeviceStateChanged,
                EventType::DeviceOnline,
                EventType::DeviceOffline,
                EventType::DeviceError,
            ],
            Self::Controller => &[
                EventType::ControllerRegistered,
                EventType::ControllerOnline,
                EventType::ControllerOffline,
                EventType::ControllerHeartbeat,
                EventType::ControllerError,
            ],
            Self::Session => &[
                EventType::SessionCreated,
                EventType::SessionStarted,
                EventType::SessionPaused,
                EventType::SessionResumed,
                EventType::SessionCompleted,
                EventType::SessionAbandoned,
            ],
            Self::Gm => &[
                EventType::HintUsed,
                EventType::ManualOverride,
                EventType::GmCommand,
            ],
        }
    }

    /// Returns the first category, in precedence order, that contains
    /// `event_type`.
    #[must_use]
    pub fn classify(event_type: EventType) -> Option<Self> {
        Self::PRECEDENCE
            .into_iter()
            .find(|category| category.event_types().contains(&event_type))
    }

    /// Lower-case name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Device => "device",
            Self::Controller => "controller",
            Self::Session => "session",
            Self::Gm => "gm",
        }
    }
}

fn wrong_category(event: &DomainEvent, category: EventCategory) -> DomainError {
    DomainError::Validation(format!(
        "{} is not a {} event",
        event.event_type,
        category.as_str()
    ))
}

// --- session payloads ---

/// Payload of `SESSION_CREATED`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCreatedData {
    /// Team name, if the booking has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    /// Number of players.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_size: Option<u32>,
}

/// Payload of `SESSION_PAUSED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPausedData {
    /// Who asked for the pause.
    pub initiated_by: String,
    /// Why.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload of `SESSION_RESUMED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResumedData {
    /// Who asked for the resume.
    pub initiated_by: String,
}

/// Payload of `SESSION_COMPLETED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCompletedData {
    /// Whole seconds between start and end.
    #[serde(default)]
    pub duration_seconds: i64,
    /// Hints used over the session.
    #[serde(default)]
    pub hints_used: u32,
    /// Whether the team escaped.
    pub completed: bool,
}

/// Payload of `SESSION_ABANDONED`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAbandonedData {
    /// Why the session was abandoned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Who abandoned it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_by: Option<String>,
}

// --- scene and puzzle payloads (emitted by the aggregate) ---

/// Payload of `SCENE_COMPLETED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCompletedData {
    /// Whole seconds the scene was active.
    pub duration_seconds: i64,
}

/// Payload of `PUZZLE_SOLVED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleSolvedData {
    /// Whole seconds between puzzle start and solve.
    pub duration_seconds: i64,
    /// Recorded attempts.
    pub attempts: u32,
}

/// Payload of `PUZZLE_SKIPPED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleSkippedData {
    /// Who skipped the puzzle.
    pub initiated_by: String,
    /// Why.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// --- device payloads ---

/// Payload of `DEVICE_STATE_CHANGED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStateChangedData {
    /// State before the change, if the controller reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<Map<String, Value>>,
    /// State after the change.
    pub new_state: Map<String, Value>,
}

/// Payload of `DEVICE_ERROR` and `CONTROLLER_ERROR`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareErrorData {
    /// Vendor or firmware error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable message.
    pub error_message: String,
    /// Free-form diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
}

// --- controller payloads ---

/// Payload of `CONTROLLER_REGISTERED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerRegisteredData {
    /// Hardware family.
    pub controller_type: String,
    /// Firmware build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    /// Network address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// MAC address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// Payload of `CONTROLLER_OFFLINE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerOfflineData {
    /// When the controller was last seen by its gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Why it went offline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload of `CONTROLLER_HEARTBEAT`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerHeartbeatData {
    /// Seconds since controller boot.
    #[serde(default)]
    pub uptime_seconds: u64,
    /// Free heap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_memory_bytes: Option<u64>,
    /// CPU load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f64>,
    /// Board temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_celsius: Option<f64>,
}

// --- safety payloads ---

/// Payload of `EMERGENCY_STOP_TRIGGERED`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencyStopTriggeredData {
    /// Operator or system that pressed the stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    /// Physical or logical source (button, sensor, console).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_source: Option<String>,
    /// Why.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload of `EMERGENCY_STOP_CLEARED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyStopClearedData {
    /// Operator who cleared the stop.
    pub cleared_by: String,
}

/// Payload of `MAGLOCK_RELEASED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaglockReleasedData {
    /// Why the lock was released.
    pub reason: String,
    /// Who released it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_by: Option<String>,
}

/// Severity of a safety alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational; never pauses a session.
    Warning,
    /// Pauses the named session, best effort.
    Critical,
    /// Any severity this service does not recognise.
    #[serde(other)]
    Other,
}

/// Payload of `SAFETY_ALERT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAlertData {
    /// How serious the alert is.
    pub severity: AlertSeverity,
    /// Alert classification, e.g. `smoke_detected`.
    pub alert_type: String,
    /// Human-readable message.
    pub message: String,
    /// Reporting sensor or system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

// --- game-master payloads ---

/// Payload of `HINT_USED`. Inbound events from the GM console carry the hint
/// details; events emitted by the aggregate carry the new total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HintUsedData {
    /// Running hint total for the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints_used: Option<u32>,
    /// Ordinal of the delivered hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_number: Option<u32>,
    /// Hint text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_text: Option<String>,
    /// Delivery channel (audio, video, text, in person).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_by: Option<String>,
    /// Operator who sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiated_by: Option<String>,
}

/// Payload of `MANUAL_OVERRIDE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverrideData {
    /// `puzzle`, `device`, `scene`, or `effect`.
    pub target_type: String,
    /// Identifier of the overridden target.
    pub target_id: String,
    /// Requested action, e.g. `skip`, `solve`, `reset`.
    pub action: String,
    /// Action parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    /// Operator.
    pub initiated_by: String,
    /// Why.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload of `GM_COMMAND`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmCommandData {
    /// Command name, e.g. `pause`, `end_game`.
    pub command: String,
    /// Command parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    /// Operator.
    pub initiated_by: String,
}

// --- category unions ---

/// Session lifecycle requests.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was booked for a room.
    Created {
        session_id: String,
        room_id: String,
        data: SessionCreatedData,
    },
    /// Start requested.
    Started {
        session_id: String,
        room_id: Option<String>,
    },
    /// Pause requested.
    Paused {
        session_id: String,
        room_id: Option<String>,
        data: SessionPausedData,
    },
    /// Resume requested.
    Resumed {
        session_id: String,
        room_id: Option<String>,
        data: SessionResumedData,
    },
    /// Completion requested.
    Completed {
        session_id: String,
        room_id: Option<String>,
        data: SessionCompletedData,
    },
    /// The session was abandoned.
    Abandoned {
        session_id: String,
        room_id: Option<String>,
        data: SessionAbandonedData,
    },
}

impl TryFrom<&DomainEvent> for SessionEvent {
    type Error = DomainError;

    fn try_from(event: &DomainEvent) -> Result<Self, Self::Error> {
        let session_id = event.require_session_id()?.to_owned();
        let room_id = event.room_id.clone();
        Ok(match event.event_type {
            EventType::SessionCreated => Self::Created {
                session_id,
                room_id: event.require_room_id()?.to_owned(),
                data: event.payload()?,
            },
            EventType::SessionStarted => Self::Started {
                session_id,
                room_id,
            },
            EventType::SessionPaused => Self::Paused {
                session_id,
                room_id,
                data: event.payload()?,
            },
            EventType::SessionResumed => Self::Resumed {
                session_id,
                room_id,
                data: event.payload()?,
            },
            EventType::SessionCompleted => Self::Completed {
                session_id,
                room_id,
                data: event.payload()?,
            },
            EventType::SessionAbandoned => Self::Abandoned {
                session_id,
                room_id,
                data: event.payload()?,
            },
            _ => return Err(wrong_category(event, EventCategory::Session)),
        })
    }
}

/// A device reported a new state.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStateChange {
    /// The device.
    pub device_id: String,
    /// The controller the device hangs off.
    pub controller_id: Option<String>,
    /// The room, when the gateway knows it.
    pub room_id: Option<String>,
    /// State payload.
    pub data: DeviceStateChangedData,
}

/// Device state and connectivity.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// The device changed state.
    StateChanged(DeviceStateChange),
    /// The device came online.
    Online {
        device_id: String,
        controller_id: Option<String>,
        room_id: Option<String>,
    },
    /// The device went offline.
    Offline {
        device_id: String,
        controller_id: Option<String>,
        room_id: Option<String>,
    },
    /// The device reported a fault.
    Error {
        device_id: String,
        controller_id: Option<String>,
        room_id: Option<String>,
        data: HardwareErrorData,
    },
}

impl TryFrom<&DomainEvent> for DeviceEvent {
    type Error = DomainError;

    fn try_from(event: &DomainEvent) -> Result<Self, DomainError> {
        let device_id = event.require_device_id()?.to_owned();
        let controller_id = event.controller_id.clone();
        let room_id = event.room_id.clone();
        Ok(match event.event_type {
            EventType::DeviceStateChanged => Self::StateChanged(DeviceStateChange {
                device_id,
                controller_id,
                room_id,
                data: event.payload()?,
            }),
            EventType::DeviceOnline => Self::Online {
                device_id,
                controller_id,
                room_id,
            },
            EventType::DeviceOffline => Self::Offline {
                device_id,
                controller_id,
                room_id,
            },
            EventType::DeviceError => Self::Error {
                device_id,
                controller_id,
                room_id,
                data: event.payload()?,
            },
            _ => return Err(wrong_category(event, EventCategory::Device)),
        })
    }
}

/// Controller lifecycle and heartbeats.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A controller announced itself.
    Registered {
        controller_id: String,
        room_id: Option<String>,
        data: ControllerRegisteredData,
    },
    /// A controller came online.
    Online {
        controller_id: String,
        room_id: Option<String>,
    },
    /// A controller went offline.
    Offline {
        controller_id: String,
        room_id: Option<String>,
        data: ControllerOfflineData,
    },
    /// Periodic liveness signal.
    Heartbeat {
        controller_id: String,
        room_id: Option<String>,
        data: ControllerHeartbeatData,
    },
    /// A controller reported a fault.
    Error {
        controller_id: String,
        room_id: Option<String>,
        data: HardwareErrorData,
    },
}

impl TryFrom<&DomainEvent> for ControllerEvent {
    type Error = DomainError;

    fn try_from(event: &DomainEvent) -> Result<Self, DomainError> {
        let controller_id = event.require_controller_id()?.to_owned();
        let room_id = event.room_id.clone();
        Ok(match event.event_type {
            EventType::ControllerRegistered => Self::Registered {
                controller_id,
                room_id,
                data: event.payload()?,
            },
            EventType::ControllerOnline => Self::Online {
                controller_id,
                room_id,
            },
            EventType::ControllerOffline => Self::Offline {
                controller_id,
                room_id,
                data: event.payload()?,
            },
            EventType::ControllerHeartbeat => Self::Heartbeat {
                controller_id,
                room_id,
                data: event.payload()?,
            },
            EventType::ControllerError => Self::Error {
                controller_id,
                room_id,
                data: event.payload()?,
            },
            _ => return Err(wrong_category(event, EventCategory::Controller)),
        })
    }
}

/// Safety signals.
#[derive(Debug, Clone, PartialEq)]
pub enum SafetyEvent {
    /// A room's emergency stop was pressed.
    EmergencyStopTriggered {
        room_id: String,
        session_id: Option<String>,
        data: EmergencyStopTriggeredData,
    },
    /// A room's emergency stop was cleared.
    EmergencyStopCleared {
        room_id: String,
        session_id: Option<String>,
        data: EmergencyStopClearedData,
    },
    /// A maglock was released.
    MaglockReleased {
        device_id: String,
        controller_id: Option<String>,
        room_id: String,
        session_id: Option<String>,
        data: MaglockReleasedData,
    },
    /// A sensor or operator raised an alert.
    SafetyAlert {
        room_id: String,
        session_id: Option<String>,
        data: SafetyAlertData,
    },
}

impl TryFrom<&DomainEvent> for SafetyEvent {
    type Error = DomainError;

    fn try_from(event: &DomainEvent) -> Result<Self, DomainError> {
        let room_id = event.require_room_id()?.to_owned();
        let session_id = event.session_id.clone();
        Ok(match event.event_type {
            EventType::EmergencyStopTriggered => Self::EmergencyStopTriggered {
                room_id,
                session_id,
                data: event.payload()?,
            },
            EventType::EmergencyStopCleared => Self::EmergencyStopCleared {
                room_id,
                session_id,
                data: event.payload()?,
            },
            EventType::MaglockReleased => Self::MaglockReleased {
                device_id: event.require_device_id()?.to_owned(),
                controller_id: event.controller_id.clone(),
                room_id,
                session_id,
                data: event.payload()?,
            },
            EventType::SafetyAlert => Self::SafetyAlert {
                room_id,
                session_id,
                data: event.payload()?,
            },
            _ => return Err(wrong_category(event, EventCategory::Safety)),
        })
    }
}

/// Operator actions.
#[derive(Debug, Clone, PartialEq)]
pub enum GmEvent {
    /// A hint was delivered.
    HintUsed {
        session_id: String,
        room_id: Option<String>,
        data: HintUsedData,
    },
    /// A manual override was executed.
    ManualOverride {
        session_id: Option<String>,
        room_id: Option<String>,
        data: ManualOverrideData,
    },
    /// A console command was issued.
    Command {
        session_id: Option<String>,
        room_id: Option<String>,
        data: GmCommandData,
    },
}

impl TryFrom<&DomainEvent> for GmEvent {
    type Error = DomainError;

    fn try_from(event: &DomainEvent) -> Result<Self, DomainError> {
        let room_id = event.room_id.clone();
        Ok(match event.event_type {
            EventType::HintUsed => Self::HintUsed {
                session_id: event.require_session_id()?.to_owned(),
                room_id,
                data: event.payload()?,
            },
            EventType::ManualOverride => Self::ManualOverride {
                session_id: event.session_id.clone(),
                room_id,
                data: event.payload()?,
            },
            EventType::GmCommand => Self::Command {
                session_id: event.session_id.clone(),
                room_id,
                data: event.payload()?,
            },
            _ => return Err(wrong_category(event, EventCategory::Gm)),
        })
    }
}

/// A classified, decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutedEvent {
    Safety(SafetyEvent),
    Device(DeviceEvent),
    Controller(ControllerEvent),
    Session(SessionEvent),
    Gm(GmEvent),
}

impl RoutedEvent {
    /// Decodes `event` as a member of `category`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a required correlation id or
    /// payload field is missing or malformed.
    pub fn decode(category: EventCategory, event: &DomainEvent) -> Result<Self, DomainError> {
        Ok(match category {
            EventCategory::Safety => Self::Safety(SafetyEvent::try_from(event)?),
            EventCategory::Device => Self::Device(DeviceEvent::try_from(event)?),
            EventCategory::Controller => Self::Controller(ControllerEvent::try_from(event)?),
            EventCategory::Session => Self::Session(SessionEvent::try_from(event)?),
            EventCategory::Gm => Self::Gm(GmEvent::try_from(event)?),
        })
    }
}
