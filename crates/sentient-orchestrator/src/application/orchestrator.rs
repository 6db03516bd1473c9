//! The orchestrator service.
//!
//! Holds the active-session cache and drives every session mutation through
//! the same sequence: mutate the aggregate, save it, then relay its staged
//! events. A failed relay leaves the unpublished tail staged, so the next
//! commit (or [`OrchestratorService::flush_pending`]) retries it. A failed
//! save replaces the cached copy with the stored one, so nothing unsaved is
//! ever relayed.

use std::collections::HashMap;
use std::sync::Arc;

use sentient_core::aggregate::AggregateRoot;
use sentient_core::clock::Clock;
use sentient_core::error::DomainError;
use sentient_core::event::DomainEvent;
use sentient_core::publisher::EventPublisher;
use tracing::{debug, info, warn};

use crate::domain::aggregates::{GameSession, GameSessionAggregate, GameSessionStatus};
use crate::domain::events::{DeviceStateChange, SessionCreatedData};
use crate::domain::puzzle_evaluator::{DeviceStateSnapshot, PuzzleCatalog, PuzzleEvaluator};
use crate::domain::repository::SessionRepository;

/// Persists aggregates and relays their staged events.
struct SessionCommitter {
    repository: Arc<dyn SessionRepository>,
    publisher: Arc<dyn EventPublisher>,
    origin: String,
}

impl SessionCommitter {
    async fn persist(&self, aggregate: &mut GameSessionAggregate) -> Result<(), DomainError> {
        self.repository.save(aggregate).await?;
        aggregate.mark_persisted();
        Ok(())
    }

    /// Publishes staged events in order, acknowledging the published prefix
    /// even when a later publish fails.
    async fn flush(&self, aggregate: &mut GameSessionAggregate) -> Result<(), DomainError> {
        let mut published = 0;
        let mut failure = None;
        for event in aggregate.uncommitted_events() {
            let mut relayed = event.clone();
            relayed.emitted_by = Some(self.origin.clone());
            match self.publisher.publish(&relayed).await {
                Ok(()) => {
                    debug!(
                        event_type = %relayed.event_type,
                        event_id = %relayed.event_id,
                        "published event"
                    );
                    published += 1;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        aggregate.acknowledge_events(published);

        match failure {
            None => Ok(()),
            Some(DomainError::Transport(msg)) => Err(DomainError::Transport(msg)),
            Some(other) => Err(DomainError::Transport(other.to_string())),
        }
    }
}

/// Coordinates active game sessions against incoming events.
pub struct OrchestratorService {
    committer: SessionCommitter,
    catalog: Option<Arc<dyn PuzzleCatalog>>,
    evaluator: PuzzleEvaluator,
    clock: Arc<dyn Clock>,
    active_sessions: HashMap<String, GameSessionAggregate>,
    /// Latest device state per room, keyed by device id.
    device_states: HashMap<String, DeviceStateSnapshot>,
}

impl OrchestratorService {
    /// Creates a service with an empty cache. `origin` is stamped as
    /// `emitted_by` on every relayed event.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            committer: SessionCommitter {
                repository,
                publisher,
                origin: origin.into(),
            },
            catalog: None,
            evaluator: PuzzleEvaluator,
            clock,
            active_sessions: HashMap::new(),
            device_states: HashMap::new(),
        }
    }

    /// Enables puzzle evaluation on device state changes.
    #[must_use]
    pub fn with_puzzle_catalog(mut self, catalog: Arc<dyn PuzzleCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Service name stamped on relayed events.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.committer.origin
    }

    /// Returns the clock this service reads.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Looks up a cached session.
    #[must_use]
    pub fn active_session(&self, session_id: &str) -> Option<&GameSessionAggregate> {
        self.active_sessions.get(session_id)
    }

    /// Every cached session.
    pub fn active_sessions(&self) -> impl Iterator<Item = &GameSessionAggregate> {
        self.active_sessions.values()
    }

    /// Latest reported state of a device in a room.
    #[must_use]
    pub fn device_state(
        &self,
        room_id: &str,
        device_id: &str,
    ) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.device_states.get(room_id)?.get(device_id)
    }

    /// Stores a booked session in `Created` status unless the store already
    /// knows it. Emits nothing. Returns `true` if the session was new.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` or `DomainError::ConcurrencyConflict`
    /// if the store fails.
    pub async fn register_session(
        &mut self,
        session_id: &str,
        room_id: &str,
        team: SessionCreatedData,
    ) -> Result<bool, DomainError> {
        if self.committer.repository.find_by_id(session_id).await?.is_some() {
            return Ok(false);
        }
        let session = GameSession::new(session_id, room_id, self.clock.now())
            .with_team(team.team_name, team.team_size);
        let mut aggregate = GameSessionAggregate::new(session);
        self.committer.repository.save(&aggregate).await?;
        aggregate.mark_persisted();
        info!(session_id, room_id, "registered session");
        Ok(true)
    }

    /// Caches every running or paused session of a room, replacing cached
    /// copies.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the store fails.
    pub async fn load_active_sessions(&mut self, room_id: &str) -> Result<usize, DomainError> {
        let sessions = self
            .committer
            .repository
            .find_active_by_room_id(room_id)
            .await?;
        let loaded = sessions.len();
        for aggregate in sessions {
            info!(session_id = aggregate.id(), room_id, "loaded active session");
            self.active_sessions
                .insert(aggregate.id().to_owned(), aggregate);
        }
        Ok(loaded)
    }

    /// Starts a session, loading it from the store on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the store does not know the session,
    /// `DomainError::InvalidStateTransition` if it cannot start, or a
    /// persistence/transport error from the commit.
    pub async fn start_session(&mut self, session_id: &str) -> Result<(), DomainError> {
        if !self.active_sessions.contains_key(session_id) {
            let loaded = self
                .committer
                .repository
                .find_by_id(session_id)
                .await?
                .ok_or_else(|| DomainError::not_found("session", session_id))?;
            self.active_sessions.insert(session_id.to_owned(), loaded);
        }

        self.mutate_active(session_id, |aggregate, clock| aggregate.start(clock))
            .await?;
        info!(session_id, "session started");
        Ok(())
    }

    /// Pauses a cached session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotActive` on a cache miss,
    /// `DomainError::InvalidStateTransition` unless running, or a commit error.
    pub async fn pause_session(
        &mut self,
        session_id: &str,
        initiated_by: &str,
        reason: Option<&str>,
    ) -> Result<(), DomainError> {
        self.mutate_active(session_id, |aggregate, clock| {
            aggregate.pause(initiated_by, reason, clock)
        })
        .await?;
        info!(session_id, initiated_by, "session paused");
        Ok(())
    }

    /// Resumes a cached session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotActive` on a cache miss,
    /// `DomainError::InvalidStateTransition` unless paused, or a commit error.
    pub async fn resume_session(
        &mut self,
        session_id: &str,
        initiated_by: &str,
    ) -> Result<(), DomainError> {
        self.mutate_active(session_id, |aggregate, clock| {
            aggregate.resume(initiated_by, clock)
        })
        .await?;
        info!(session_id, initiated_by, "session resumed");
        Ok(())
    }

    /// Completes a cached session and evicts it once its events are relayed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotActive` on a cache miss,
    /// `DomainError::InvalidStateTransition` unless running, or a commit error.
    pub async fn complete_session(
        &mut self,
        session_id: &str,
        completed: bool,
    ) -> Result<(), DomainError> {
        let result = self
            .mutate_active(session_id, |aggregate, clock| {
                aggregate.complete(completed, clock)
            })
            .await;
        self.evict_if_finished(session_id);
        result?;
        info!(session_id, completed, "session completed");
        Ok(())
    }

    /// Skips a puzzle in a cached session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotActive` on a cache miss,
    /// `DomainError::NotFound` if the puzzle was never started, or a commit
    /// error.
    pub async fn skip_puzzle(
        &mut self,
        session_id: &str,
        puzzle_id: &str,
        initiated_by: &str,
    ) -> Result<(), DomainError> {
        self.mutate_active(session_id, |aggregate, clock| {
            aggregate.skip_puzzle(puzzle_id, initiated_by, clock)
        })
        .await?;
        info!(session_id, puzzle_id, initiated_by, "puzzle skipped");
        Ok(())
    }

    /// Counts a hint for a cached session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotActive` on a cache miss, or a commit
    /// error.
    pub async fn use_hint(&mut self, session_id: &str) -> Result<(), DomainError> {
        self.mutate_active(session_id, |aggregate, clock| {
            aggregate.use_hint(clock);
            Ok(())
        })
        .await?;
        info!(session_id, "hint used");
        Ok(())
    }

    /// Records a device's new state and evaluates the in-progress puzzles of
    /// every running session in the device's room. A solved puzzle is
    /// committed immediately.
    ///
    /// # Errors
    ///
    /// Returns the first catalog, aggregate, or commit error encountered;
    /// the remaining sessions are still evaluated.
    pub async fn handle_device_state_change(
        &mut self,
        change: &DeviceStateChange,
    ) -> Result<(), DomainError> {
        let Some(room_id) = change.room_id.as_deref() else {
            debug!(device_id = %change.device_id, "device state change without room");
            return Ok(());
        };

        self.device_states
            .entry(room_id.to_owned())
            .or_default()
            .insert(change.device_id.clone(), change.data.new_state.clone());

        let mut running: Vec<String> = self
            .active_sessions
            .values()
            .filter(|s| s.room_id() == room_id && s.status() == GameSessionStatus::Running)
            .map(|s| s.id().to_owned())
            .collect();
        running.sort();

        let mut first_error = None;
        for session_id in &running {
            if let Err(e) = self
                .evaluate_puzzles(session_id, room_id, &change.device_id)
                .await
            {
                warn!(session_id = %session_id, error = %e, "puzzle evaluation failed");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    async fn evaluate_puzzles(
        &mut self,
        session_id: &str,
        room_id: &str,
        device_id: &str,
    ) -> Result<(), DomainError> {
        let Some(aggregate) = self.active_sessions.get_mut(session_id) else {
            return Ok(());
        };
        debug!(session_id, device_id, "evaluating puzzles");

        let Some(scene_id) = aggregate.current_scene_id().map(str::to_owned) else {
            debug!(session_id, "no current scene; nothing to evaluate");
            return Ok(());
        };
        let Some(catalog) = &self.catalog else {
            debug!(session_id, "no puzzle catalog; nothing to evaluate");
            return Ok(());
        };

        let puzzles = catalog.puzzles_for_scene(&scene_id).await?;
        let already_persisted = aggregate.uncommitted_events().len();
        let in_progress = aggregate.in_progress_puzzle_ids();
        let empty = DeviceStateSnapshot::new();
        let states = self.device_states.get(room_id).unwrap_or(&empty);

        let mut solved_any = false;
        for puzzle in puzzles.iter().filter(|p| in_progress.contains(&p.id)) {
            let evaluation = self.evaluator.evaluate(puzzle, states);
            if evaluation.solved {
                aggregate.solve_puzzle(&puzzle.id, self.clock.as_ref())?;
                info!(session_id, puzzle_id = %puzzle.id, "puzzle solved");
                solved_any = true;
            } else {
                debug!(
                    session_id,
                    puzzle_id = %puzzle.id,
                    progress = ?evaluation.progress,
                    message = ?evaluation.message,
                    "puzzle not solved"
                );
            }
        }

        if solved_any {
            self.commit_cached(session_id, already_persisted).await?;
        }
        Ok(())
    }

    /// Retries relaying events left staged by an earlier failed publish, and
    /// evicts completed sessions whose outbox is drained.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; remaining sessions are still
    /// attempted.
    pub async fn flush_pending(&mut self) -> Result<(), DomainError> {
        let mut first_error = None;
        let mut ids: Vec<String> = self
            .active_sessions
            .values()
            .filter(|s| !s.uncommitted_events().is_empty())
            .map(|s| s.id().to_owned())
            .collect();
        ids.sort();

        for session_id in &ids {
            let Some(aggregate) = self.active_sessions.get_mut(session_id) else {
                continue;
            };
            if let Err(e) = self.committer.flush(aggregate).await {
                warn!(session_id = %session_id, error = %e, "event relay retry failed");
                first_error.get_or_insert(e);
            }
            self.evict_if_finished(session_id);
        }

        first_error.map_or(Ok(()), Err)
    }

    async fn mutate_active<F>(&mut self, session_id: &str, mutate: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut GameSessionAggregate, &dyn Clock) -> Result<(), DomainError> + Send,
    {
        let aggregate = self
            .active_sessions
            .get_mut(session_id)
            .ok_or_else(|| DomainError::SessionNotActive(session_id.to_owned()))?;
        let already_persisted = aggregate.uncommitted_events().len();
        mutate(aggregate, self.clock.as_ref())?;
        self.commit_cached(session_id, already_persisted).await
    }

    /// Saves a cached session and relays its outbox. The first
    /// `already_persisted` staged events belong to earlier saves.
    async fn commit_cached(
        &mut self,
        session_id: &str,
        already_persisted: usize,
    ) -> Result<(), DomainError> {
        let aggregate = self
            .active_sessions
            .get_mut(session_id)
            .ok_or_else(|| DomainError::SessionNotActive(session_id.to_owned()))?;
        if let Err(e) = self.committer.persist(aggregate).await {
            let carried: Vec<DomainEvent> = aggregate
                .uncommitted_events()
                .iter()
                .take(already_persisted)
                .cloned()
                .collect();
            self.reload_after_failed_save(session_id, carried).await;
            return Err(e);
        }
        self.committer.flush(aggregate).await
    }

    /// Drops unsaved changes by replacing the cached copy with the stored one.
    async fn reload_after_failed_save(&mut self, session_id: &str, carried: Vec<DomainEvent>) {
        self.active_sessions.remove(session_id);
        match self.committer.repository.find_by_id(session_id).await {
            Ok(Some(mut stored)) => {
                stored.carry_over_events(carried);
                warn!(
                    session_id,
                    version = stored.version(),
                    "save failed; reloaded session from store"
                );
                self.active_sessions.insert(session_id.to_owned(), stored);
                self.evict_if_finished(session_id);
            }
            Ok(None) => warn!(session_id, "save failed and store has no session; evicted"),
            Err(e) => warn!(session_id, error = %e, "save failed and reload failed; evicted"),
        }
    }

    fn evict_if_finished(&mut self, session_id: &str) {
        let finished = self.active_sessions.get(session_id).is_some_and(|s| {
            s.status() == GameSessionStatus::Completed && s.uncommitted_events().is_empty()
        });
        if finished {
            self.active_sessions.remove(session_id);
        }
    }
}

impl std::fmt::Debug for OrchestratorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorService")
            .field("origin", &self.committer.origin)
            .field("active_sessions", &self.active_sessions.len())
            .field("rooms_with_device_state", &self.device_states.len())
            .finish_non_exhaustive()
    }
}
