//! In-process implementations of the domain's storage seams.

pub mod memory_puzzle_catalog;
pub mod memory_session_repository;

pub use memory_puzzle_catalog::InMemoryPuzzleCatalog;
pub use memory_session_repository::InMemorySessionRepository;
