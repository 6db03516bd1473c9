//! Puzzle catalog backed by a list of definitions held in memory.

use std::path::Path;

use async_trait::async_trait;
use sentient_core::error::DomainError;

use crate::domain::puzzle_evaluator::{Puzzle, PuzzleCatalog};

/// A fixed set of puzzle definitions, typically loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPuzzleCatalog {
    puzzles: Vec<Puzzle>,
}

impl InMemoryPuzzleCatalog {
    #[must_use]
    pub fn new(puzzles: Vec<Puzzle>) -> Self {
        Self { puzzles }
    }

    /// Parses a JSON array of puzzle definitions.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the document is not a list of
    /// puzzles.
    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        let puzzles: Vec<Puzzle> = serde_json::from_str(raw)
            .map_err(|e| DomainError::Validation(format!("invalid puzzle catalog: {e}")))?;
        Ok(Self::new(puzzles))
    }

    /// Reads and parses a JSON puzzle catalog file.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the file cannot be read, or
    /// `DomainError::Validation` if it cannot be parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, DomainError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Persistence(format!("cannot read puzzle catalog {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Number of definitions held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }
}

#[async_trait]
impl PuzzleCatalog for InMemoryPuzzleCatalog {
    async fn puzzles_for_scene(&self, scene_id: &str) -> Result<Vec<Puzzle>, DomainError> {
        let mut puzzles: Vec<Puzzle> = self
            .puzzles
            .iter()
            .filter(|p| p.active && p.scene_id.as_deref() == Some(scene_id))
            .cloned()
            .collect();
        puzzles.sort_by_key(|p| p.order);
        Ok(puzzles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_puzzles_for_scene_filters_inactive_and_sorts_by_order() {
        // Arrange
        let raw = json!([
            { "id": "p-b", "room_id": "r", "scene_id": "s-1", "name": "B", "order": 2 },
            { "id": "p-a", "room_id": "r", "scene_id": "s-1", "name": "A", "order": 1 },
            { "id": "p-off", "room_id": "r", "scene_id": "s-1", "name": "Off", "active": false },
            { "id": "p-other", "room_id": "r", "scene_id": "s-2", "name": "Other" }
        ])
        .to_string();
        let catalog = InMemoryPuzzleCatalog::from_json(&raw).unwrap();

        // Act
        let puzzles = catalog.puzzles_for_scene("s-1").await.unwrap();

        // Assert
        let ids: Vec<&str> = puzzles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-a", "p-b"]);
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_from_json_rejects_non_list_document() {
        let result = InMemoryPuzzleCatalog::from_json(r#"{ "id": "p-1" }"#);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_from_json_file_reports_missing_file() {
        let result = InMemoryPuzzleCatalog::from_json_file(Path::new("/nonexistent/puzzles.json"));

        assert!(matches!(result, Err(DomainError::Persistence(_))));
    }
}
