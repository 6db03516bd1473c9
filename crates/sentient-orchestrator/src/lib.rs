//! Sentient: game-session orchestration.
//!
//! Consumes domain events from the venue's bus, keeps each running game
//! session's state machine, tracks controller health and safety state, and
//! relays the resulting session events back onto the bus.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::orchestrator::OrchestratorService;
pub use application::router::{DispatchOutcome, EventRouter};
