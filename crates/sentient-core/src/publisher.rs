//! Event publisher abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// Publishes domain events onto the shared bus.
///
/// A successful return means the bus accepted the message; delivery beyond
/// that is the bus's concern.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event.
    async fn publish(&self, event: &DomainEvent) -> Result<(), DomainError>;
}
