//! Repository for the `samples` table (append-only time-series).

use sqlx::{PgConnection, PgPool};
use uptrack_core::types::DbId;

use crate::models::sample::{CreateSample, Sample};

/// Column list for `samples` SELECT queries (includes `id` and `created_at`).
const COLUMNS: &str = "\
    id, entity_type, entity_id, ip_address, raw_status, \
    latency_ms, packet_loss_pct, rtt_min_ms, rtt_avg_ms, rtt_max_ms, \
    checked_at, source, created_at";

/// Column list for `samples` INSERT statements (excludes auto-generated
/// `id` and `created_at`).
const INSERT_COLUMNS: &str = "\
    entity_type, entity_id, ip_address, raw_status, \
    latency_ms, packet_loss_pct, rtt_min_ms, rtt_avg_ms, rtt_max_ms, \
    checked_at, source";

/// Provides query operations for reachability samples. Rows are append-only;
/// there are no update or delete methods.
pub struct SampleRepo;

impl SampleRepo {
    /// Insert a single sample inside the caller's transaction.
    pub async fn insert(
        conn: &mut PgConnection,
        sample: &CreateSample,
    ) -> Result<Sample, sqlx::Error> {
        let query = format!(
            "INSERT INTO samples ({INSERT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Sample>(&query)
            .bind(&sample.entity_type)
            .bind(sample.entity_id)
            .bind(&sample.ip_address)
            .bind(&sample.raw_status)
            .bind(sample.latency_ms)
            .bind(sample.packet_loss_pct)
            .bind(sample.rtt_min_ms)
            .bind(sample.rtt_avg_ms)
            .bind(sample.rtt_max_ms)
            .bind(sample.checked_at)
            .bind(&sample.source)
            .fetch_one(&mut *conn)
            .await
    }

    /// Get the most recent sample for an entity, if any.
    pub async fn latest_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Option<Sample>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM samples \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY checked_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Sample>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_optional(pool)
            .await
    }
}
