//! In-memory session store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sentient_core::error::DomainError;

use crate::domain::aggregates::{GameSessionAggregate, SessionSnapshot};
use crate::domain::repository::SessionRepository;

/// Keeps session snapshots in a process-local map. Last writer wins.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, SessionSnapshot>>,
}

impl InMemorySessionRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, e.g. with sessions booked by another service.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the store lock is poisoned.
    pub fn insert(&self, snapshot: SessionSnapshot) -> Result<(), DomainError> {
        self.lock()?.insert(snapshot.session.id.clone(), snapshot);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SessionSnapshot>>, DomainError> {
        self.sessions
            .lock()
            .map_err(|_| DomainError::Persistence("session store lock poisoned".into()))
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(
        &self,
        session_id: &str,
    ) -> Result<Option<GameSessionAggregate>, DomainError> {
        Ok(self
            .lock()?
            .get(session_id)
            .cloned()
            .map(GameSessionAggregate::from_snapshot))
    }

    async fn save(&self, aggregate: &GameSessionAggregate) -> Result<(), DomainError> {
        let mut snapshot = aggregate.snapshot();
        snapshot.version += 1;
        self.lock()?.insert(snapshot.session.id.clone(), snapshot);
        Ok(())
    }

    async fn find_active_by_room_id(
        &self,
        room_id: &str,
    ) -> Result<Vec<GameSessionAggregate>, DomainError> {
        let sessions = self.lock()?;
        let mut active: Vec<SessionSnapshot> = sessions
            .values()
            .filter(|s| s.session.room_id == room_id && s.session.status.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.session.id.cmp(&b.session.id));
        Ok(active
            .into_iter()
            .map(GameSessionAggregate::from_snapshot)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sentient_core::aggregate::AggregateRoot;
    use sentient_test_support::FixedClock;

    use crate::domain::aggregates::{GameSession, GameSessionStatus};

    fn aggregate(id: &str, room_id: &str, status: GameSessionStatus) -> GameSessionAggregate {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let mut session = GameSession::new(id, room_id, created_at);
        session.status = status;
        GameSessionAggregate::new(session)
    }

    #[tokio::test]
    async fn test_save_then_find_returns_state_without_staged_events() {
        // Arrange
        let repo = InMemorySessionRepository::new();
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 5, 0).unwrap());
        let mut session = aggregate("s-1", "room-1", GameSessionStatus::Created);
        session.start(&clock).unwrap();

        // Act
        repo.save(&session).await.unwrap();
        let loaded = repo.find_by_id("s-1").await.unwrap().unwrap();

        // Assert
        assert_eq!(loaded.status(), GameSessionStatus::Running);
        assert!(loaded.uncommitted_events().is_empty());
    }

    #[tokio::test]
    async fn test_find_unknown_session_returns_none() {
        let repo = InMemorySessionRepository::new();

        let loaded = repo.find_by_id("s-missing").await.unwrap();

        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_find_active_by_room_returns_running_and_paused_only() {
        // Arrange
        let repo = InMemorySessionRepository::new();
        for (id, room, status) in [
            ("s-1", "room-1", GameSessionStatus::Running),
            ("s-2", "room-1", GameSessionStatus::Paused),
            ("s-3", "room-1", GameSessionStatus::Completed),
            ("s-4", "room-1", GameSessionStatus::Created),
            ("s-5", "room-2", GameSessionStatus::Running),
        ] {
            repo.save(&aggregate(id, room, status)).await.unwrap();
        }

        // Act
        let active = repo.find_active_by_room_id("room-1").await.unwrap();

        // Assert
        let ids: Vec<&str> = active.iter().map(GameSessionAggregate::id).collect();
        assert_eq!(ids, vec!["s-1", "s-2"]);
    }

    #[tokio::test]
    async fn test_second_save_overwrites_first() {
        let repo = InMemorySessionRepository::new();
        repo.save(&aggregate("s-1", "room-1", GameSessionStatus::Running))
            .await
            .unwrap();

        repo.save(&aggregate("s-1", "room-1", GameSessionStatus::Paused))
            .await
            .unwrap();

        let loaded = repo.find_by_id("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.status(), GameSessionStatus::Paused);
    }
}
