//! Append-only status push log.

use serde::Serialize;
use sqlx::FromRow;
use uptrack_core::types::{DbId, Timestamp};

/// A row from the `status_logs` table: one entry per single-entity status
/// push, regardless of whether the push carried detailed metrics.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusLog {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub raw_status: String,
    pub message: Option<String>,
    pub logged_at: Timestamp,
}
