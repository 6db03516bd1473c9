//! Test publishers: mock `EventPublisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use sentient_core::error::DomainError;
use sentient_core::event::{DomainEvent, EventType};
use sentient_core::publisher::EventPublisher;

/// A publisher that records every event it is handed. It can be told to start
/// failing after a number of successful publishes, to exercise partial
/// flushes.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    published: Mutex<Vec<DomainEvent>>,
    fail_after: Mutex<Option<usize>>,
}

impl RecordingEventPublisher {
    /// Create a publisher that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a publisher that accepts `successes` events and then fails
    /// every publish until [`RecordingEventPublisher::recover`] is called.
    #[must_use]
    pub fn failing_after(successes: usize) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail_after: Mutex::new(Some(successes)),
        }
    }

    /// Stop failing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn recover(&self) {
        *self.fail_after.lock().unwrap() = None;
    }

    /// Returns a snapshot of all events that were published.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_events(&self) -> Vec<DomainEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the types of all published events, in publish order.
    pub fn published_types(&self) -> Vec<EventType> {
        self.published_events()
            .iter()
            .map(|event| event.event_type)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), DomainError> {
        let mut published = self.published.lock().unwrap();
        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if published.len() >= limit {
                return Err(DomainError::Transport("bus unavailable".into()));
            }
        }
        published.push(event.clone());
        Ok(())
    }
}

/// A publisher that always returns a transport error.
#[derive(Debug)]
pub struct FailingEventPublisher;

#[async_trait]
impl EventPublisher for FailingEventPublisher {
    async fn publish(&self, _event: &DomainEvent) -> Result<(), DomainError> {
        Err(DomainError::Transport("bus unavailable".into()))
    }
}
