//! HTTP routes: health, event ingress, and orchestrator status.

pub mod events;
pub mod health;
pub mod status;
