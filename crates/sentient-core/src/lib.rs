//! Sentient Core: shared domain abstractions.
//!
//! This crate defines the wire-level domain event envelope, the error
//! taxonomy, and the traits (clock, aggregate, publisher) that the
//! orchestration engine and its infrastructure adapters share. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod publisher;
