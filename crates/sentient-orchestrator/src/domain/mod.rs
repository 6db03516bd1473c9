//! Domain layer: the session aggregate, typed events, puzzle evaluation, and
//! the persistence contract.

pub mod aggregates;
pub mod events;
pub mod puzzle_evaluator;
pub mod repository;
