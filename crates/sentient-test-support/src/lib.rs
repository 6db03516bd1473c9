//! Shared test mocks and utilities for the Sentient orchestration engine.

mod clock;
mod publisher;

pub use clock::{FixedClock, ManualClock};
pub use publisher::{FailingEventPublisher, RecordingEventPublisher};
