//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Aggregates and the orchestrator service return these synchronously to
/// their caller; the domain event handlers are the only layer that logs and
/// swallows them.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An inbound event or request was malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced session, scene, or puzzle does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The session is not held in the active-session cache.
    #[error("session {0} not active")]
    SessionNotActive(String),

    /// A state-machine guard rejected the requested action.
    #[error("invalid state transition: cannot {action} session {session_id} in {from} status")]
    InvalidStateTransition {
        /// The session whose transition was rejected.
        session_id: String,
        /// The status the session was in.
        from: String,
        /// The rejected action.
        action: &'static str,
    },

    /// Optimistic concurrency conflict in a durable session store.
    #[error(
        "concurrency conflict on session {session_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The session that had the conflict.
        session_id: String,
        /// The version the writer expected.
        expected: i64,
        /// The version found in the store.
        actual: i64,
    },

    /// Publishing to or subscribing from the event bus failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The session store failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    /// Shorthand for [`DomainError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_transition_message_names_session_and_status() {
        let err = DomainError::InvalidStateTransition {
            session_id: "s-1".to_owned(),
            from: "paused".to_owned(),
            action: "pause",
        };

        assert_eq!(
            err.to_string(),
            "invalid state transition: cannot pause session s-1 in paused status"
        );
    }

    #[test]
    fn test_not_found_shorthand_formats_entity_and_id() {
        let err = DomainError::not_found("puzzle", "p-7");

        assert_eq!(err.to_string(), "puzzle not found: p-7");
    }
}
