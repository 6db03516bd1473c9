//! `PostgreSQL` implementation of the `SessionRepository` trait.

use async_trait::async_trait;
use sentient_core::error::DomainError;
use sentient_orchestrator::domain::aggregates::{
    GameSessionAggregate, GameSessionStatus, SessionSnapshot,
};
use sentient_orchestrator::domain::repository::SessionRepository;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::debug;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies the bundled schema migrations.
///
/// # Errors
///
/// Returns `DomainError::Persistence` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DomainError::Persistence(format!("migration failed: {e}")))
}

/// PostgreSQL-backed session store.
///
/// Each session is one row holding its JSON snapshot and a version counter.
/// `save` only succeeds if the stored version still equals the aggregate's.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Creates a new `PgSessionRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn stored_version(&self, session_id: &str) -> Result<Option<i64>, DomainError> {
        sqlx::query_scalar("SELECT version FROM game_sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)
    }
}

fn persistence(e: sqlx::Error) -> DomainError {
    DomainError::Persistence(e.to_string())
}

fn decode(row: &PgRow) -> Result<GameSessionAggregate, DomainError> {
    let Json(mut snapshot): Json<SessionSnapshot> = row.try_get("snapshot").map_err(persistence)?;
    snapshot.version = row.try_get("version").map_err(persistence)?;
    Ok(GameSessionAggregate::from_snapshot(snapshot))
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_by_id(
        &self,
        session_id: &str,
    ) -> Result<Option<GameSessionAggregate>, DomainError> {
        let row = sqlx::query("SELECT snapshot, version FROM game_sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.as_ref().map(decode).transpose()
    }

    async fn save(&self, aggregate: &GameSessionAggregate) -> Result<(), DomainError> {
        let mut snapshot = aggregate.snapshot();
        let expected = snapshot.version;
        snapshot.version = expected + 1;
        let session_id = snapshot.session.id.clone();
        let room_id = snapshot.session.room_id.clone();
        let status = snapshot.session.status.as_str();

        let result = if expected == 0 {
            sqlx::query(
                "INSERT INTO game_sessions (session_id, room_id, status, snapshot, version, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, NOW()) \
                 ON CONFLICT (session_id) DO NOTHING",
            )
            .bind(&session_id)
            .bind(&room_id)
            .bind(status)
            .bind(Json(snapshot))
            .bind(expected + 1)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                "UPDATE game_sessions \
                 SET room_id = $2, status = $3, snapshot = $4, version = $5, updated_at = NOW() \
                 WHERE session_id = $1 AND version = $6",
            )
            .bind(&session_id)
            .bind(&room_id)
            .bind(status)
            .bind(Json(snapshot))
            .bind(expected + 1)
            .bind(expected)
            .execute(&self.pool)
            .await
        }
        .map_err(persistence)?;

        if result.rows_affected() == 0 {
            let actual = self.stored_version(&session_id).await?.unwrap_or(0);
            return Err(DomainError::ConcurrencyConflict {
                session_id,
                expected,
                actual,
            });
        }

        debug!(session_id = %session_id, status, version = expected + 1, "saved session");
        Ok(())
    }

    async fn find_active_by_room_id(
        &self,
        room_id: &str,
    ) -> Result<Vec<GameSessionAggregate>, DomainError> {
        let rows = sqlx::query(
            "SELECT snapshot, version FROM game_sessions \
             WHERE room_id = $1 AND status IN ($2, $3) \
             ORDER BY session_id",
        )
        .bind(room_id)
        .bind(GameSessionStatus::Running.as_str())
        .bind(GameSessionStatus::Paused.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.iter().map(decode).collect()
    }
}
