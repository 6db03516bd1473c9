//! In-process domain-event bus.
//!
//! Messages travel as serialized JSON, exactly as they would over a network
//! pub/sub channel, so subscribers exercise the same decoding path.

use async_trait::async_trait;
use sentient_core::error::DomainError;
use sentient_core::event::DomainEvent;
use sentient_core::publisher::EventPublisher;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Name of the shared domain-event channel.
pub const DOMAIN_EVENTS_CHANNEL: &str = "sentient:events:domain";

/// Broadcast channel carrying JSON-encoded domain events.
#[derive(Debug, Clone)]
pub struct InMemoryEventBus {
    sender: broadcast::Sender<String>,
}

impl InMemoryEventBus {
    /// Creates a bus that buffers up to `capacity` messages per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to every message published from now on.
    #[must_use]
    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: &DomainEvent) -> Result<(), DomainError> {
        let message = event.to_json()?;
        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(
                    channel = DOMAIN_EVENTS_CHANNEL,
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    receivers,
                    "published domain event"
                );
            }
            // Nobody listening is not a failure on a pub/sub channel.
            Err(_) => {
                debug!(
                    channel = DOMAIN_EVENTS_CHANNEL,
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    "published domain event with no subscribers"
                );
            }
        }
        Ok(())
    }
}

/// One subscriber's view of the bus.
#[derive(Debug)]
pub struct BusSubscription {
    receiver: broadcast::Receiver<String>,
}

impl BusSubscription {
    /// Waits for the next well-formed event. Malformed messages are logged
    /// and skipped. Returns `None` once every publisher is gone.
    pub async fn next_event(&mut self) -> Option<DomainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(raw) => match DomainEvent::from_json(&raw) {
                    Ok(event) => return Some(event),
                    Err(e) => {
                        warn!(channel = DOMAIN_EVENTS_CHANNEL, error = %e, "discarding malformed bus message");
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = DOMAIN_EVENTS_CHANNEL, skipped, "bus subscriber lagged; messages dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
