//! Vendor alarm feed models: current state and history.

use serde::Serialize;
use sqlx::FromRow;
use uptrack_core::types::{DbId, Timestamp};

/// A row from the `alarm_records` current-state table, unique per
/// (device_id, alarm_type). Deleted when the alarm clears.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlarmRecord {
    pub id: DbId,
    pub device_id: String,
    pub alarm_type: String,
    pub location: Option<String>,
    pub occurred_at: Timestamp,
    /// Display string from the feed, e.g. `"2 min ago"`.
    pub time_ago: Option<String>,
    pub updated_at: Timestamp,
}

/// A row from the append-only `alarm_history` table.
///
/// `cleared_at` and `duration_seconds` are stamped exactly once, when the
/// alarm clears; open rows have both NULL.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlarmHistoryEntry {
    pub id: DbId,
    pub device_id: String,
    pub alarm_type: String,
    pub location: Option<String>,
    pub occurred_at: Timestamp,
    pub cleared_at: Option<Timestamp>,
    pub duration_seconds: Option<i64>,
    pub created_at: Timestamp,
}

/// A row from the `device_records` table: the per-device rollup of the
/// alarm feed. `ALARM` while any alarm is open, `ONLINE` once the latest
/// snapshot reports none.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceRecord {
    pub id: DbId,
    pub device_id: String,
    /// `"ALARM"` or `"ONLINE"`.
    pub status: String,
    pub last_seen_at: Timestamp,
    pub updated_at: Timestamp,
}
