//! The game-session aggregate.
//!
//! [`GameSessionAggregate`] exclusively owns one session's state and an
//! outbox of staged [`DomainEvent`]s. Every mutator validates its guard,
//! updates state, and stages exactly one event; the orchestrator persists the
//! aggregate and then relays the outbox.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use sentient_core::aggregate::AggregateRoot;
use sentient_core::clock::Clock;
use sentient_core::error::DomainError;
use sentient_core::event::{DomainEvent, EventType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Lifecycle status of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameSessionStatus {
    Created,
    Ready,
    Running,
    Paused,
    Completed,
}

impl GameSessionStatus {
    /// Returns `true` for statuses the repository reports as active.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Returns the wire name of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for GameSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single team's run through a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Session identifier.
    pub id: String,
    /// The room being played.
    pub room_id: String,
    /// Lifecycle status.
    pub status: GameSessionStatus,
    /// Team name, if known.
    #[serde(default)]
    pub team_name: Option<String>,
    /// Number of players, if known.
    #[serde(default)]
    pub team_size: Option<u32>,
    /// When the session was booked.
    pub created_at: DateTime<Utc>,
    /// Set by `start`.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Set by `complete`.
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether the team escaped.
    #[serde(default)]
    pub completed: bool,
    /// Whole seconds played, set by `complete` when the session was started.
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    /// Hints delivered so far. Never decreases.
    #[serde(default)]
    pub hints_used: u32,
}

impl GameSession {
    /// Creates a session in `Created` status.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        room_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            room_id: room_id.into(),
            status: GameSessionStatus::Created,
            team_name: None,
            team_size: None,
            created_at,
            started_at: None,
            ended_at: None,
            completed: false,
            duration_seconds: None,
            hints_used: 0,
        }
    }

    /// Sets the team details.
    #[must_use]
    pub fn with_team(mut self, team_name: Option<String>, team_size: Option<u32>) -> Self {
        self.team_name = team_name;
        self.team_size = team_size;
        self
    }
}

/// Progress status of one puzzle within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleStatus {
    NotStarted,
    InProgress,
    Solved,
    Failed,
    Skipped,
}

/// One puzzle's progress within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleProgress {
    pub puzzle_id: String,
    pub status: PuzzleStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempts: u32,
    /// Opaque progress detail reported by the puzzle's devices.
    #[serde(default)]
    pub progress: Map<String, Value>,
}

/// Progress status of one scene within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    NotStarted,
    Active,
    Completed,
}

/// One scene's progress within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneProgress {
    pub scene_id: String,
    pub status: SceneStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Persistable state of a [`GameSessionAggregate`]. Staged events are not part
/// of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session: GameSession,
    #[serde(default)]
    pub puzzles: BTreeMap<String, PuzzleProgress>,
    #[serde(default)]
    pub scenes: BTreeMap<String, SceneProgress>,
    #[serde(default)]
    pub current_scene_id: Option<String>,
    /// Number of successful saves.
    #[serde(default)]
    pub version: i64,
}

/// Whole seconds between two instants, rounded toward negative infinity.
fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds().div_euclid(1000)
}

/// The aggregate root for a game session.
#[derive(Debug)]
pub struct GameSessionAggregate {
    session: GameSession,
    puzzles: BTreeMap<String, PuzzleProgress>,
    scenes: BTreeMap<String, SceneProgress>,
    current_scene_id: Option<String>,
    /// Number of successful saves.
    version: i64,
    /// Staged events pending publication.
    uncommitted_events: Vec<DomainEvent>,
}

impl GameSessionAggregate {
    /// Wraps a session with no puzzle or scene progress.
    #[must_use]
    pub fn new(session: GameSession) -> Self {
        Self {
            session,
            puzzles: BTreeMap::new(),
            scenes: BTreeMap::new(),
            current_scene_id: None,
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }

    /// Rebuilds an aggregate from persisted state, with an empty outbox.
    #[must_use]
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            session: snapshot.session,
            puzzles: snapshot.puzzles,
            scenes: snapshot.scenes,
            current_scene_id: snapshot.current_scene_id,
            version: snapshot.version,
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the persistable state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session.clone(),
            puzzles: self.puzzles.clone(),
            scenes: self.scenes.clone(),
            current_scene_id: self.current_scene_id.clone(),
            version: self.version,
        }
    }

    /// Records a successful save.
    pub fn mark_persisted(&mut self) {
        self.version += 1;
    }

    #[must_use]
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.session.id
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.session.room_id
    }

    #[must_use]
    pub fn status(&self) -> GameSessionStatus {
        self.session.status
    }

    #[must_use]
    pub fn puzzle_progress(&self, puzzle_id: &str) -> Option<&PuzzleProgress> {
        self.puzzles.get(puzzle_id)
    }

    #[must_use]
    pub fn scene_progress(&self, scene_id: &str) -> Option<&SceneProgress> {
        self.scenes.get(scene_id)
    }

    #[must_use]
    pub fn current_scene_id(&self) -> Option<&str> {
        self.current_scene_id.as_deref()
    }

    /// Ids of puzzles currently in progress, in id order.
    #[must_use]
    pub fn in_progress_puzzle_ids(&self) -> Vec<String> {
        self.puzzles
            .values()
            .filter(|p| p.status == PuzzleStatus::InProgress)
            .map(|p| p.puzzle_id.clone())
            .collect()
    }

    /// Re-stages events that were already persisted but not yet relayed, so a
    /// copy reloaded from the store keeps the earlier outbox.
    pub fn carry_over_events(&mut self, events: Vec<DomainEvent>) {
        self.uncommitted_events.splice(0..0, events);
    }

    fn event(&self, event_type: EventType, at: DateTime<Utc>) -> DomainEvent {
        DomainEvent::new(event_type, at)
            .with_session_id(self.session.id.clone())
            .with_room_id(self.session.room_id.clone())
    }

    fn stage(&mut self, event: DomainEvent) {
        self.uncommitted_events.push(event);
    }

    fn guard(
        &self,
        allowed: &[GameSessionStatus],
        action: &'static str,
    ) -> Result<(), DomainError> {
        if allowed.contains(&self.session.status) {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                session_id: self.session.id.clone(),
                from: self.session.status.to_string(),
                action,
            })
        }
    }

    /// Starts the session, staging `SESSION_STARTED`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless the session is
    /// `Created` or `Ready`.
    pub fn start(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        self.guard(
            &[GameSessionStatus::Created, GameSessionStatus::Ready],
            "start",
        )?;
        let now = clock.now();
        self.session.status = GameSessionStatus::Running;
        self.session.started_at = Some(now);

        let event = self.event(EventType::SessionStarted, now);
        self.stage(event);
        Ok(())
    }

    /// Pauses a running session, staging `SESSION_PAUSED`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless the session is
    /// `Running`.
    pub fn pause(
        &mut self,
        initiated_by: &str,
        reason: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.guard(&[GameSessionStatus::Running], "pause")?;
        self.session.status = GameSessionStatus::Paused;

        let mut data = Map::new();
        data.insert("initiated_by".to_owned(), json!(initiated_by));
        if let Some(reason) = reason {
            data.insert("reason".to_owned(), json!(reason));
        }
        let event = self
            .event(EventType::SessionPaused, clock.now())
            .with_data(Value::Object(data));
        self.stage(event);
        Ok(())
    }

    /// Resumes a paused session, staging `SESSION_RESUMED`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless the session is
    /// `Paused`.
    pub fn resume(&mut self, initiated_by: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        self.guard(&[GameSessionStatus::Paused], "resume")?;
        self.session.status = GameSessionStatus::Running;

        let event = self
            .event(EventType::SessionResumed, clock.now())
            .with_data(json!({ "initiated_by": initiated_by }));
        self.stage(event);
        Ok(())
    }

    /// Ends a running session, staging `SESSION_COMPLETED` with the played
    /// duration and hint count.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless the session is
    /// `Running`.
    pub fn complete(&mut self, completed: bool, clock: &dyn Clock) -> Result<(), DomainError> {
        self.guard(&[GameSessionStatus::Running], "complete")?;
        let now = clock.now();
        self.session.status = GameSessionStatus::Completed;
        self.session.ended_at = Some(now);
        self.session.completed = completed;
        if let Some(started_at) = self.session.started_at {
            self.session.duration_seconds = Some(elapsed_seconds(started_at, now));
        }

        let event = self
            .event(EventType::SessionCompleted, now)
            .with_data(json!({
                "duration_seconds": self.session.duration_seconds.unwrap_or(0),
                "hints_used": self.session.hints_used,
                "completed": completed,
            }));
        self.stage(event);
        Ok(())
    }

    /// Activates a scene (registering it if new) and makes it current,
    /// staging `SCENE_STARTED`.
    pub fn start_scene(&mut self, scene_id: &str, clock: &dyn Clock) {
        let now = clock.now();
        let scene = self
            .scenes
            .entry(scene_id.to_owned())
            .or_insert_with(|| SceneProgress {
                scene_id: scene_id.to_owned(),
                status: SceneStatus::NotStarted,
                started_at: None,
                completed_at: None,
            });
        scene.status = SceneStatus::Active;
        scene.started_at = Some(now);
        self.current_scene_id = Some(scene_id.to_owned());

        let event = self
            .event(EventType::SceneStarted, now)
            .with_scene_id(scene_id);
        self.stage(event);
    }

    /// Completes a registered scene, staging `SCENE_COMPLETED` with the
    /// elapsed seconds.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the scene was never started.
    pub fn complete_scene(&mut self, scene_id: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        let now = clock.now();
        let scene = self
            .scenes
            .get_mut(scene_id)
            .ok_or_else(|| DomainError::not_found("scene", scene_id))?;
        scene.status = SceneStatus::Completed;
        scene.completed_at = Some(now);
        let duration_seconds = scene
            .started_at
            .map_or(0, |started_at| elapsed_seconds(started_at, now));

        let event = self
            .event(EventType::SceneCompleted, now)
            .with_scene_id(scene_id)
            .with_data(json!({ "duration_seconds": duration_seconds }));
        self.stage(event);
        Ok(())
    }

    /// Marks a puzzle in progress (registering it if new), staging
    /// `PUZZLE_STARTED`.
    pub fn start_puzzle(&mut self, puzzle_id: &str, clock: &dyn Clock) {
        let now = clock.now();
        let puzzle = self
            .puzzles
            .entry(puzzle_id.to_owned())
            .or_insert_with(|| PuzzleProgress {
                puzzle_id: puzzle_id.to_owned(),
                status: PuzzleStatus::NotStarted,
                started_at: None,
                completed_at: None,
                attempts: 0,
                progress: Map::new(),
            });
        puzzle.status = PuzzleStatus::InProgress;
        puzzle.started_at = Some(now);

        let event = self
            .event(EventType::PuzzleStarted, now)
            .with_puzzle_id(puzzle_id);
        self.stage(event);
    }

    /// Marks a registered puzzle solved, staging `PUZZLE_SOLVED` with the
    /// elapsed seconds and attempt count.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the puzzle was never started.
    pub fn solve_puzzle(&mut self, puzzle_id: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        let now = clock.now();
        let puzzle = self
            .puzzles
            .get_mut(puzzle_id)
            .ok_or_else(|| DomainError::not_found("puzzle", puzzle_id))?;
        puzzle.status = PuzzleStatus::Solved;
        puzzle.completed_at = Some(now);
        let data = json!({
            "duration_seconds": puzzle
                .started_at
                .map_or(0, |started_at| elapsed_seconds(started_at, now)),
            "attempts": puzzle.attempts,
        });

        let event = self
            .event(EventType::PuzzleSolved, now)
            .with_puzzle_id(puzzle_id)
            .with_data(data);
        self.stage(event);
        Ok(())
    }

    /// Marks a registered puzzle skipped, staging `PUZZLE_SKIPPED`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the puzzle was never started.
    pub fn skip_puzzle(
        &mut self,
        puzzle_id: &str,
        initiated_by: &str,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let now = clock.now();
        let puzzle = self
            .puzzles
            .get_mut(puzzle_id)
            .ok_or_else(|| DomainError::not_found("puzzle", puzzle_id))?;
        puzzle.status = PuzzleStatus::Skipped;
        puzzle.completed_at = Some(now);

        let event = self
            .event(EventType::PuzzleSkipped, now)
            .with_puzzle_id(puzzle_id)
            .with_data(json!({ "initiated_by": initiated_by }));
        self.stage(event);
        Ok(())
    }

    /// Counts a delivered hint, staging `HINT_USED` with the new total.
    pub fn use_hint(&mut self, clock: &dyn Clock) {
        self.session.hints_used = self.session.hints_used.saturating_add(1);

        let event = self
            .event(EventType::HintUsed, clock.now())
            .with_data(json!({ "hints_used": self.session.hints_used }));
        self.stage(event);
    }
}

impl AggregateRoot for GameSessionAggregate {
    fn aggregate_id(&self) -> &str {
        &self.session.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[DomainEvent] {
        &self.uncommitted_events
    }

    fn acknowledge_events(&mut self, count: usize) {
        let count = count.min(self.uncommitted_events.len());
        self.uncommitted_events.drain(..count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{
        HintUsedData, PuzzleSkippedData, PuzzleSolvedData, SceneCompletedData,
        SessionCompletedData, SessionPausedData,
    };
    use chrono::TimeZone;
    use sentient_test_support::{FixedClock, ManualClock};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn session_in(status: GameSessionStatus) -> GameSessionAggregate {
        let mut session = GameSession::new("s-1", "room-1", t0());
        session.status = status;
        GameSessionAggregate::new(session)
    }

    #[test]
    fn test_start_from_created_runs_and_stages_session_started() {
        // Arrange
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Created);

        // Act
        aggregate.start(&clock).unwrap();

        // Assert
        assert_eq!(aggregate.status(), GameSessionStatus::Running);
        assert_eq!(aggregate.session().started_at, Some(t0()));
        let events = aggregate.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::SessionStarted);
        assert_eq!(events[0].session_id.as_deref(), Some("s-1"));
        assert_eq!(events[0].room_id.as_deref(), Some("room-1"));
        assert_eq!(events[0].timestamp, t0());
    }

    #[test]
    fn test_start_from_ready_is_allowed() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Ready);

        aggregate.start(&clock).unwrap();

        assert_eq!(aggregate.status(), GameSessionStatus::Running);
    }

    #[test]
    fn test_start_while_running_is_rejected_without_staging() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);

        let result = aggregate.start(&clock);

        assert!(matches!(
            result,
            Err(DomainError::InvalidStateTransition { action: "start", .. })
        ));
        assert!(aggregate.uncommitted_events().is_empty());
    }

    #[test]
    fn test_second_consecutive_pause_fails() {
        // Arrange
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);
        aggregate.pause("gm-ana", Some("phone call"), &clock).unwrap();

        // Act
        let result = aggregate.pause("gm-ana", None, &clock);

        // Assert
        match result {
            Err(DomainError::InvalidStateTransition {
                session_id,
                from,
                action,
            }) => {
                assert_eq!(session_id, "s-1");
                assert_eq!(from, "paused");
                assert_eq!(action, "pause");
            }
            other => panic!("expected InvalidStateTransition, got {other:?}"),
        }
        assert_eq!(aggregate.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_pause_only_succeeds_from_running() {
        let clock = FixedClock(t0());
        for status in [
            GameSessionStatus::Created,
            GameSessionStatus::Ready,
            GameSessionStatus::Paused,
            GameSessionStatus::Completed,
        ] {
            let mut aggregate = session_in(status);

            let result = aggregate.pause("gm", None, &clock);

            assert!(result.is_err(), "pause from {status} should fail");
            assert_eq!(aggregate.status(), status);
        }
    }

    #[test]
    fn test_pause_payload_carries_initiator_and_reason() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);

        aggregate
            .pause("EMERGENCY_STOP", Some("Emergency stop: smoke"), &clock)
            .unwrap();

        let data: SessionPausedData = aggregate.uncommitted_events()[0].payload().unwrap();
        assert_eq!(data.initiated_by, "EMERGENCY_STOP");
        assert_eq!(data.reason.as_deref(), Some("Emergency stop: smoke"));
    }

    #[test]
    fn test_pause_without_reason_omits_reason_field() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);

        aggregate.pause("gm-ana", None, &clock).unwrap();

        let data = &aggregate.uncommitted_events()[0].data;
        assert_eq!(data, &json!({ "initiated_by": "gm-ana" }));
    }

    #[test]
    fn test_resume_returns_paused_session_to_running() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Paused);

        aggregate.resume("gm-ana", &clock).unwrap();

        assert_eq!(aggregate.status(), GameSessionStatus::Running);
        assert_eq!(
            aggregate.uncommitted_events()[0].event_type,
            EventType::SessionResumed
        );
    }

    #[test]
    fn test_resume_while_running_is_rejected() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);

        let result = aggregate.resume("gm-ana", &clock);

        assert!(matches!(
            result,
            Err(DomainError::InvalidStateTransition { action: "resume", .. })
        ));
    }

    #[test]
    fn test_complete_records_outcome_and_floored_duration() {
        // Arrange
        let clock = ManualClock::new(t0());
        let mut aggregate = session_in(GameSessionStatus::Created);
        aggregate.start(&clock).unwrap();
        aggregate.use_hint(&clock);
        aggregate.use_hint(&clock);
        clock.advance_millis(3_725_999);

        // Act
        aggregate.complete(true, &clock).unwrap();

        // Assert
        let session = aggregate.session();
        assert_eq!(session.status, GameSessionStatus::Completed);
        assert!(session.completed);
        assert_eq!(session.duration_seconds, Some(3725));
        assert_eq!(session.ended_at, Some(clock.now()));

        let completed = aggregate.uncommitted_events().last().unwrap();
        assert_eq!(completed.event_type, EventType::SessionCompleted);
        let data: SessionCompletedData = completed.payload().unwrap();
        assert_eq!(
            data,
            SessionCompletedData {
                duration_seconds: 3725,
                hints_used: 2,
                completed: true,
            }
        );
    }

    #[test]
    fn test_complete_without_start_reports_zero_duration() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);

        aggregate.complete(false, &clock).unwrap();

        assert_eq!(aggregate.session().duration_seconds, None);
        let data: SessionCompletedData = aggregate.uncommitted_events()[0].payload().unwrap();
        assert_eq!(data.duration_seconds, 0);
        assert!(!data.completed);
    }

    #[test]
    fn test_complete_from_paused_is_rejected() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Paused);

        let result = aggregate.complete(true, &clock);

        assert!(result.is_err());
        assert_eq!(aggregate.status(), GameSessionStatus::Paused);
    }

    #[test]
    fn test_cleared_outbox_grows_by_one_per_mutator() {
        // Arrange
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Created);
        aggregate.start(&clock).unwrap();
        aggregate.use_hint(&clock);

        // Act
        aggregate.clear_uncommitted_events();

        // Assert
        assert!(aggregate.uncommitted_events().is_empty());
        aggregate.pause("gm", None, &clock).unwrap();
        assert_eq!(aggregate.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_acknowledge_events_drops_only_the_published_prefix() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Created);
        aggregate.start(&clock).unwrap();
        aggregate.use_hint(&clock);
        aggregate.pause("gm", None, &clock).unwrap();

        aggregate.acknowledge_events(2);

        let remaining: Vec<_> = aggregate
            .uncommitted_events()
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(remaining, vec![EventType::SessionPaused]);
    }

    #[test]
    fn test_use_hint_increments_and_reports_total() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);

        aggregate.use_hint(&clock);
        aggregate.use_hint(&clock);
        aggregate.use_hint(&clock);

        assert_eq!(aggregate.session().hints_used, 3);
        let last: HintUsedData = aggregate.uncommitted_events()[2].payload().unwrap();
        assert_eq!(last.hints_used, Some(3));
    }

    #[test]
    fn test_scene_lifecycle_reports_elapsed_seconds() {
        // Arrange
        let clock = ManualClock::new(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);
        aggregate.start_scene("scene-lab", &clock);
        clock.advance_millis(61_500);

        // Act
        aggregate.complete_scene("scene-lab", &clock).unwrap();

        // Assert
        assert_eq!(aggregate.current_scene_id(), Some("scene-lab"));
        let scene = aggregate.scene_progress("scene-lab").unwrap();
        assert_eq!(scene.status, SceneStatus::Completed);
        let events = aggregate.uncommitted_events();
        assert_eq!(events[0].event_type, EventType::SceneStarted);
        assert_eq!(events[0].scene_id.as_deref(), Some("scene-lab"));
        let data: SceneCompletedData = events[1].payload().unwrap();
        assert_eq!(data.duration_seconds, 61);
    }

    #[test]
    fn test_complete_unknown_scene_is_not_found() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);

        let result = aggregate.complete_scene("scene-x", &clock);

        assert!(matches!(
            result,
            Err(DomainError::NotFound { entity: "scene", .. })
        ));
        assert!(aggregate.uncommitted_events().is_empty());
    }

    #[test]
    fn test_solve_puzzle_reports_duration_and_attempts() {
        let clock = ManualClock::new(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);
        aggregate.start_puzzle("p-safe", &clock);
        clock.advance_millis(42_000);

        aggregate.solve_puzzle("p-safe", &clock).unwrap();

        let progress = aggregate.puzzle_progress("p-safe").unwrap();
        assert_eq!(progress.status, PuzzleStatus::Solved);
        let solved = &aggregate.uncommitted_events()[1];
        assert_eq!(solved.puzzle_id.as_deref(), Some("p-safe"));
        let data: PuzzleSolvedData = solved.payload().unwrap();
        assert_eq!(data.duration_seconds, 42);
        assert_eq!(data.attempts, 0);
    }

    #[test]
    fn test_skip_and_solve_of_unregistered_puzzle_are_not_found() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);

        let skipped = aggregate.skip_puzzle("p-none", "gm", &clock);
        let solved = aggregate.solve_puzzle("p-none", &clock);

        assert!(matches!(skipped, Err(DomainError::NotFound { entity: "puzzle", .. })));
        assert!(matches!(solved, Err(DomainError::NotFound { entity: "puzzle", .. })));
        assert!(aggregate.uncommitted_events().is_empty());
    }

    #[test]
    fn test_skip_puzzle_records_initiator() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Running);
        aggregate.start_puzzle("p-safe", &clock);

        aggregate.skip_puzzle("p-safe", "gm-ana", &clock).unwrap();

        assert_eq!(
            aggregate.puzzle_progress("p-safe").unwrap().status,
            PuzzleStatus::Skipped
        );
        let data: PuzzleSkippedData = aggregate.uncommitted_events()[1].payload().unwrap();
        assert_eq!(data.initiated_by, "gm-ana");
        assert!(aggregate.in_progress_puzzle_ids().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip_keeps_state_and_drops_outbox() {
        let clock = FixedClock(t0());
        let mut aggregate = session_in(GameSessionStatus::Created);
        aggregate.start(&clock).unwrap();
        aggregate.start_scene("scene-1", &clock);
        aggregate.start_puzzle("p-1", &clock);
        aggregate.mark_persisted();

        let restored = GameSessionAggregate::from_snapshot(aggregate.snapshot());

        assert_eq!(restored.snapshot(), aggregate.snapshot());
        assert_eq!(restored.version(), 1);
        assert!(restored.uncommitted_events().is_empty());
        assert_eq!(restored.in_progress_puzzle_ids(), vec!["p-1".to_owned()]);
    }
}
