//! Sentient Infrastructure: adapters behind the orchestrator's ports.
//!
//! [`bus::InMemoryEventBus`] is the in-process domain-event channel;
//! [`pg_session_repository::PgSessionRepository`] is the durable session
//! store.

pub mod bus;
pub mod pg_session_repository;

pub use bus::{BusSubscription, DOMAIN_EVENTS_CHANNEL, InMemoryEventBus};
pub use pg_session_repository::{PgSessionRepository, run_migrations};
