//! Repository for the `entity_states` table (one mutable row per entity).

use sqlx::{PgConnection, PgPool};
use uptrack_core::types::{DbId, Timestamp};

use crate::models::entity_state::EntityState;

/// Column list for `entity_states` SELECT queries.
const COLUMNS: &str = "\
    id, entity_type, entity_id, raw_status, stable_state, \
    consecutive_failures, consecutive_successes, down_since, \
    uptime_seconds, downtime_seconds, last_checked_at, last_state_change_at, \
    updated_at";

/// Provides query operations for per-entity tracking state.
pub struct EntityStateRepo;

impl EntityStateRepo {
    /// Lock and return the state row for an entity, creating the initial
    /// Up-with-zeroed-counters row if none exists yet.
    ///
    /// Must run inside a caller-owned transaction: the returned row is
    /// locked `FOR UPDATE`, which is what serializes concurrent samples for
    /// the same entity.
    pub async fn lock_or_init(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<EntityState, sqlx::Error> {
        sqlx::query(
            "INSERT INTO entity_states (entity_type, entity_id) \
             VALUES ($1, $2) \
             ON CONFLICT (entity_type, entity_id) DO NOTHING",
        )
        .bind(entity_type)
        .bind(entity_id)
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM entity_states \
             WHERE entity_type = $1 AND entity_id = $2 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, EntityState>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Persist the outcome of one sample: classification counters, stable
    /// state, accounting buckets, and check timestamps.
    #[allow(clippy::too_many_arguments)]
    pub async fn store_sample_outcome(
        conn: &mut PgConnection,
        state_id: DbId,
        raw_status: &str,
        stable_state: &str,
        consecutive_failures: i32,
        consecutive_successes: i32,
        down_since: Option<Timestamp>,
        last_state_change_at: Option<Timestamp>,
        uptime_credit: i64,
        downtime_credit: i64,
        checked_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE entity_states SET \
                raw_status = $2, \
                stable_state = $3, \
                consecutive_failures = $4, \
                consecutive_successes = $5, \
                down_since = $6, \
                last_state_change_at = $7, \
                uptime_seconds = uptime_seconds + $8, \
                downtime_seconds = downtime_seconds + $9, \
                last_checked_at = $10, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(state_id)
        .bind(raw_status)
        .bind(stable_state)
        .bind(consecutive_failures)
        .bind(consecutive_successes)
        .bind(down_since)
        .bind(last_state_change_at)
        .bind(uptime_credit)
        .bind(downtime_credit)
        .bind(checked_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Get the current state row for an entity, if any.
    pub async fn find(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Option<EntityState>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entity_states \
             WHERE entity_type = $1 AND entity_id = $2"
        );
        sqlx::query_as::<_, EntityState>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_optional(pool)
            .await
    }
}
