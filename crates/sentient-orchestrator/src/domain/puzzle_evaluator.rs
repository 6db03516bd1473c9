//! Puzzle solution evaluation.
//!
//! A puzzle's [`SolutionConfig`] lists the devices that must hold particular
//! states. [`PuzzleEvaluator::evaluate`] compares those against the latest
//! reported device states. It is pure: no clock, no I/O.

use std::collections::HashMap;

use async_trait::async_trait;
use sentient_core::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Latest reported state per device id.
pub type DeviceStateSnapshot = HashMap<String, Map<String, Value>>;

/// One device that must be in a given state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredDeviceState {
    pub device_id: String,
    /// Keys that must be present with equal values. Extra keys on the device
    /// are ignored.
    pub required_state: Map<String, Value>,
}

/// Declarative description of a solved puzzle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionConfig {
    #[serde(default)]
    pub required_devices: Vec<RequiredDeviceState>,
}

/// A puzzle definition as authored for a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,
    pub room_id: String,
    #[serde(default)]
    pub scene_id: Option<String>,
    pub name: String,
    /// Position within the scene.
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub hint_text: Option<String>,
    #[serde(default)]
    pub solution_config: Option<SolutionConfig>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial progress towards a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationProgress {
    pub completed_devices: usize,
    pub total_devices: usize,
    /// `floor(100 * completed / total)`.
    pub completion_percentage: u32,
}

/// Outcome of evaluating one puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleEvaluation {
    pub solved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<EvaluationProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Evaluates puzzle solution specs against device states.
#[derive(Debug, Clone, Copy, Default)]
pub struct PuzzleEvaluator;

impl PuzzleEvaluator {
    /// Evaluates `puzzle` against `device_states`.
    ///
    /// Required devices are checked in order. The first device with no
    /// reported state short-circuits with a message and no progress; the
    /// first mismatch short-circuits with progress computed over every
    /// required device.
    #[must_use]
    pub fn evaluate(&self, puzzle: &Puzzle, device_states: &DeviceStateSnapshot) -> PuzzleEvaluation {
        let Some(solution) = &puzzle.solution_config else {
            return PuzzleEvaluation {
                solved: false,
                progress: None,
                message: Some("no solution config defined".to_owned()),
            };
        };

        for required in &solution.required_devices {
            let Some(actual) = device_states.get(&required.device_id) else {
                return PuzzleEvaluation {
                    solved: false,
                    progress: None,
                    message: Some(format!("device {} state not found", required.device_id)),
                };
            };
            if !state_matches(actual, &required.required_state) {
                return PuzzleEvaluation {
                    solved: false,
                    progress: Some(progress(&solution.required_devices, device_states)),
                    message: None,
                };
            }
        }

        PuzzleEvaluation {
            solved: true,
            progress: None,
            message: Some("puzzle solved".to_owned()),
        }
    }
}

fn state_matches(actual: &Map<String, Value>, required: &Map<String, Value>) -> bool {
    required
        .iter()
        .all(|(key, expected)| actual.get(key) == Some(expected))
}

#[allow(clippy::cast_possible_truncation)]
fn progress(required: &[RequiredDeviceState], device_states: &DeviceStateSnapshot) -> EvaluationProgress {
    let completed = required
        .iter()
        .filter(|req| {
            device_states
                .get(&req.device_id)
                .is_some_and(|state| state_matches(state, &req.required_state))
        })
        .count();
    let total = required.len();
    let completion_percentage = if total == 0 {
        0
    } else {
        (completed * 100 / total) as u32
    };
    EvaluationProgress {
        completed_devices: completed,
        total_devices: total,
        completion_percentage,
    }
}

/// Source of puzzle definitions.
#[async_trait]
pub trait PuzzleCatalog: Send + Sync {
    /// Returns the active puzzles of a scene, in authored order.
    async fn puzzles_for_scene(&self, scene_id: &str) -> Result<Vec<Puzzle>, DomainError>;
}
