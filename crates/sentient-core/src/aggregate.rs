//! Aggregate root abstraction.

use crate::event::DomainEvent;

/// Trait for aggregate roots that stage domain events in an outbox.
///
/// Mutators append to the outbox; the owner persists the aggregate and then
/// relays the staged events, acknowledging them as they are published.
pub trait AggregateRoot: Send + Sync {
    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> &str;

    /// Returns the number of times this aggregate has been persisted.
    fn version(&self) -> i64;

    /// Returns events staged by mutators and not yet published.
    fn uncommitted_events(&self) -> &[DomainEvent];

    /// Drops the first `count` staged events after they were published.
    fn acknowledge_events(&mut self, count: usize);

    /// Drops every staged event.
    fn clear_uncommitted_events(&mut self) {
        let pending = self.uncommitted_events().len();
        self.acknowledge_events(pending);
    }
}
