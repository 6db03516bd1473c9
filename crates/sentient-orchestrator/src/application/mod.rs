//! Application layer: the orchestrator service, category handlers, router,
//! and read-only views.

pub mod controller_health;
pub mod handlers;
pub mod orchestrator;
pub mod query_handlers;
pub mod router;
