//! Session persistence contract.

use async_trait::async_trait;
use sentient_core::error::DomainError;

use super::aggregates::GameSessionAggregate;

/// Stores game sessions as snapshots.
///
/// Only the aggregate's state is persisted; its staged events are relayed by
/// the caller after a successful `save`, never stored.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Loads a session by id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the store fails.
    async fn find_by_id(&self, session_id: &str)
    -> Result<Option<GameSessionAggregate>, DomainError>;

    /// Stores the aggregate's current state. Durable stores compare the
    /// aggregate's version against the stored one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if another writer saved the
    /// session first, or `DomainError::Persistence` if the store fails.
    async fn save(&self, aggregate: &GameSessionAggregate) -> Result<(), DomainError>;

    /// Loads every running or paused session in a room.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the store fails.
    async fn find_active_by_room_id(
        &self,
        room_id: &str,
    ) -> Result<Vec<GameSessionAggregate>, DomainError>;
}
