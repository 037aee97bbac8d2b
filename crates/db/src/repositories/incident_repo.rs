//! Repository for the `incidents` table.

use sqlx::{PgConnection, PgPool};
use uptrack_core::types::{DbId, Timestamp};

use crate::models::incident::{CreateIncident, Incident};

/// Column list for `incidents` SELECT queries.
const COLUMNS: &str = "\
    id, entity_type, entity_id, entity_name, severity, status, \
    detected_at, resolved_at, ticket_ref, created_at, updated_at";

/// Provides query operations for tracked incidents.
pub struct IncidentRepo;

impl IncidentRepo {
    /// Find the entity's active (OPEN or IN_PROGRESS) incident, if any.
    ///
    /// Runs on the caller's connection so the dedup check shares the
    /// transaction that holds the entity's state-row lock.
    pub async fn find_active(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM incidents \
             WHERE entity_type = $1 AND entity_id = $2 \
               AND status IN ('OPEN', 'IN_PROGRESS')"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Open a new incident.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateIncident,
    ) -> Result<Incident, sqlx::Error> {
        let query = format!(
            "INSERT INTO incidents \
                (entity_type, entity_id, entity_name, severity, status, detected_at) \
             VALUES ($1, $2, $3, $4, 'OPEN', $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.entity_name)
            .bind(&input.severity)
            .bind(input.detected_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Resolve the entity's active incident. Returns the resolved row, or
    /// `None` when no active incident exists -- the caller treats that as an
    /// expected race, not an error.
    pub async fn resolve_active(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DbId,
        resolved_at: Timestamp,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!(
            "UPDATE incidents SET status = 'RESOLVED', resolved_at = $3, updated_at = NOW() \
             WHERE entity_type = $1 AND entity_id = $2 \
               AND status IN ('OPEN', 'IN_PROGRESS') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .bind(resolved_at)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Count incidents opened across all entities since the given cutoff.
    /// Drives the mass-outage suppression window.
    pub async fn count_opened_since(
        conn: &mut PgConnection,
        cutoff: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM incidents WHERE detected_at >= $1")
                .bind(cutoff)
                .fetch_one(&mut *conn)
                .await?;
        Ok(count)
    }

    /// Count incidents for one entity since the given cutoff. Drives the
    /// repeat-offender severity escalation.
    pub async fn count_for_entity_since(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DbId,
        cutoff: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM incidents \
             WHERE entity_type = $1 AND entity_id = $2 AND detected_at >= $3",
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(cutoff)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count)
    }

    /// Record the external ticket reference on an incident. Runs on the
    /// pool after the ingestion transaction committed: ticket creation is
    /// not allowed to hold entity locks.
    pub async fn set_ticket_ref(
        pool: &PgPool,
        incident_id: DbId,
        ticket_ref: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE incidents SET ticket_ref = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(incident_id)
        .bind(ticket_ref)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Get an incident by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM incidents WHERE id = $1");
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
