//! Controller liveness bookkeeping.
//!
//! Tracks the last heartbeat and the reported status of every hardware
//! controller. The staleness sweep flips silent controllers from online to
//! offline; it never overwrites an error status.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;

/// Connectivity status of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerStatus {
    Online,
    Offline,
    Error,
}

impl ControllerStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a heartbeat did to a controller's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The controller was already online.
    Steady,
    /// The controller had never been seen and is now online.
    FirstContact,
    /// The controller was offline or in error and is now online.
    Recovered(ControllerStatus),
}

/// Last heartbeat and status per controller.
#[derive(Debug, Default)]
pub struct ControllerHealthTracker {
    heartbeats: BTreeMap<String, DateTime<Utc>>,
    statuses: BTreeMap<String, ControllerStatus>,
}

impl ControllerHealthTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a heartbeat received at `at`.
    pub fn record_heartbeat(&mut self, controller_id: &str, at: DateTime<Utc>) -> HeartbeatOutcome {
        self.heartbeats.insert(controller_id.to_owned(), at);
        match self.statuses.get(controller_id).copied() {
            Some(ControllerStatus::Online) => HeartbeatOutcome::Steady,
            Some(previous) => {
                self.statuses
                    .insert(controller_id.to_owned(), ControllerStatus::Online);
                HeartbeatOutcome::Recovered(previous)
            }
            None => {
                self.statuses
                    .insert(controller_id.to_owned(), ControllerStatus::Online);
                HeartbeatOutcome::FirstContact
            }
        }
    }

    /// Marks a controller online and seeds its heartbeat at `at`.
    pub fn mark_online(&mut self, controller_id: &str, at: DateTime<Utc>) {
        self.statuses
            .insert(controller_id.to_owned(), ControllerStatus::Online);
        self.heartbeats.insert(controller_id.to_owned(), at);
    }

    /// Sets a status without touching the heartbeat.
    pub fn set_status(&mut self, controller_id: &str, status: ControllerStatus) {
        self.statuses.insert(controller_id.to_owned(), status);
    }

    /// Returns every controller whose last heartbeat is more than `timeout`
    /// before `now`, flipping those that were online to offline.
    pub fn check_stale(&mut self, timeout: Duration, now: DateTime<Utc>) -> Vec<String> {
        let mut stale = Vec::new();
        for (controller_id, last_heartbeat) in &self.heartbeats {
            let elapsed = now - *last_heartbeat;
            if elapsed <= timeout {
                continue;
            }
            stale.push(controller_id.clone());
            if self.statuses.get(controller_id) == Some(&ControllerStatus::Online) {
                self.statuses
                    .insert(controller_id.clone(), ControllerStatus::Offline);
                warn!(
                    controller_id = %controller_id,
                    last_heartbeat = %last_heartbeat.to_rfc3339(),
                    elapsed_ms = elapsed.num_milliseconds(),
                    "controller marked stale due to missing heartbeats"
                );
            }
        }
        stale
    }

    /// Status of a controller, `None` if never seen.
    #[must_use]
    pub fn status(&self, controller_id: &str) -> Option<ControllerStatus> {
        self.statuses.get(controller_id).copied()
    }

    #[must_use]
    pub fn last_heartbeat(&self, controller_id: &str) -> Option<DateTime<Utc>> {
        self.heartbeats.get(controller_id).copied()
    }

    /// Ids of online controllers, sorted.
    #[must_use]
    pub fn online_controllers(&self) -> Vec<String> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == ControllerStatus::Online)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Every known controller with its status, sorted by id.
    pub fn statuses(&self) -> impl Iterator<Item = (&str, ControllerStatus)> {
        self.statuses.iter().map(|(id, status)| (id.as_str(), *status))
    }
}
