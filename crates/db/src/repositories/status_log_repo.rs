//! Repository for the `status_logs` table (append-only push log).

use sqlx::PgPool;
use uptrack_core::types::{DbId, Timestamp};

use crate::models::status_log::StatusLog;

const COLUMNS: &str = "id, entity_type, entity_id, raw_status, message, logged_at";

/// Provides query operations for single-entity status push logs.
pub struct StatusLogRepo;

impl StatusLogRepo {
    /// Append one log entry.
    pub async fn insert(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
        raw_status: &str,
        message: Option<&str>,
        logged_at: Timestamp,
    ) -> Result<StatusLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO status_logs (entity_type, entity_id, raw_status, message, logged_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StatusLog>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .bind(raw_status)
            .bind(message)
            .bind(logged_at)
            .fetch_one(pool)
            .await
    }

    /// Get the most recent log entry for an entity, if any.
    pub async fn latest_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Option<StatusLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM status_logs \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY logged_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, StatusLog>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_optional(pool)
            .await
    }
}
