//! Monitored entity registry model (read-only in this service).

use serde::Serialize;
use sqlx::FromRow;
use uptrack_core::types::{DbId, Timestamp};

/// A row from the `monitored_entities` registry.
///
/// The registry is owned and seeded by the surrounding system; this service
/// only resolves entities by (type, external id) or by code and reads their
/// identity and IP address.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonitoredEntity {
    pub id: DbId,
    /// `"BRANCH"` or `"ATM"` (see `uptrack_core::status::EntityKind`).
    pub entity_type: String,
    /// External numeric id within the entity type.
    pub entity_id: DbId,
    /// Human short code, unique across the registry (used by push/query).
    pub code: String,
    pub name: String,
    pub location: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
}
