//! Per-entity mutable tracking state.

use serde::Serialize;
use sqlx::FromRow;
use uptrack_core::types::{DbId, Timestamp};

/// The single mutable row per entity, maintained transactionally from
/// samples.
///
/// Invariants:
/// - `down_since IS NOT NULL` iff `stable_state = 'DOWN'`.
/// - `uptime_seconds + downtime_seconds` accounts for all wall-clock time
///   since the first sample (rounding aside).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EntityState {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub raw_status: Option<String>,
    pub stable_state: String,
    pub consecutive_failures: i32,
    pub consecutive_successes: i32,
    pub down_since: Option<Timestamp>,
    pub uptime_seconds: i64,
    pub downtime_seconds: i64,
    pub last_checked_at: Option<Timestamp>,
    pub last_state_change_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}
