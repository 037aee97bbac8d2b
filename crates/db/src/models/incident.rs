//! Tracked incident models.

use serde::Serialize;
use sqlx::FromRow;
use uptrack_core::types::{DbId, Timestamp};

/// A row from the `incidents` table.
///
/// Invariant: at most one row per entity with status `OPEN` or
/// `IN_PROGRESS`, enforced in the correlator and backstopped by the partial
/// unique index `uq_incidents_active`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Incident {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub entity_name: String,
    /// `"LOW"` / `"MEDIUM"` / `"HIGH"` / `"CRITICAL"`.
    pub severity: String,
    /// `"OPEN"` / `"IN_PROGRESS"` / `"RESOLVED"`.
    pub status: String,
    pub detected_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    /// External ticket reference, stored for traceability only. The ticket's
    /// lifecycle belongs to the ticketing collaborator.
    pub ticket_ref: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for opening an incident.
#[derive(Debug, Clone)]
pub struct CreateIncident {
    pub entity_type: String,
    pub entity_id: DbId,
    pub entity_name: String,
    pub severity: String,
    pub detected_at: Timestamp,
}
