//! Alarm snapshot reconciliation planning.
//!
//! The vendor feed reports the complete set of currently-alarming devices on
//! every cycle, not incremental events. Onset and clearing are therefore
//! derived by diffing the snapshot against the previously known alarm state:
//! a device absent from the new snapshot has cleared, even if it never sent
//! a "cleared" event.
//!
//! This module only *plans* the reconciliation -- it compares two in-memory
//! sets and produces the row operations to perform. Executing the plan
//! against storage is the `api` crate's job, which keeps the diff logic
//! fully unit-testable.

use std::collections::{BTreeMap, BTreeSet};

use crate::device_id::normalize_device_id;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One row of a raw vendor snapshot, before normalization.
#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub device_id: String,
    pub alarm_type: String,
    pub location: Option<String>,
    pub occurred_at: Timestamp,
    pub time_ago: Option<String>,
}

/// The previously known alarm state: normalized device id -> the set of
/// alarm types with an open record for that device.
pub type PriorAlarms = BTreeMap<String, BTreeSet<String>>;

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// One alarm to upsert for a currently-alarming device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmUpsert {
    pub alarm_type: String,
    pub location: Option<String>,
    pub occurred_at: Timestamp,
    pub time_ago: Option<String>,
    /// Whether a new history row must be appended. False when an open
    /// history row for this (device, alarm type) already exists -- an ongoing
    /// alarm must not produce duplicate history.
    pub append_history: bool,
}

/// All operations for one currently-alarming device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePlan {
    pub device_id: String,
    pub alarms: Vec<AlarmUpsert>,
    /// Alarm types open before this snapshot but absent from it, while the
    /// device itself is still alarming on other types: stamp the history row
    /// cleared and delete the current-state record.
    pub cleared_types: Vec<String>,
}

/// The full reconciliation plan for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Per-device operations for devices present in the snapshot.
    pub alarming: Vec<DevicePlan>,
    /// Devices that were in ALARM before but are entirely absent from the
    /// snapshot: flip ONLINE, delete all current alarms, close all open
    /// history rows.
    pub devices_to_clear: Vec<String>,
    /// Rows dropped during normalization (empty device id or alarm type).
    pub dropped_rows: usize,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Diff a raw snapshot against the prior alarm state.
///
/// Rows are normalized and grouped by device id; duplicate (device, alarm
/// type) rows within one snapshot keep the first occurrence. The result is
/// deterministic: devices and alarm types are emitted in sorted order.
pub fn plan(prior: &PriorAlarms, rows: &[SnapshotRow]) -> ReconcilePlan {
    let mut dropped = 0usize;
    let mut grouped: BTreeMap<String, Vec<&SnapshotRow>> = BTreeMap::new();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    for row in rows {
        let Some(device_id) = normalize_device_id(&row.device_id) else {
            dropped += 1;
            continue;
        };
        let alarm_type = row.alarm_type.trim();
        if alarm_type.is_empty() {
            dropped += 1;
            continue;
        }
        if !seen.insert((device_id.clone(), alarm_type.to_string())) {
            continue;
        }
        grouped.entry(device_id).or_default().push(row);
    }

    let mut alarming = Vec::with_capacity(grouped.len());
    for (device_id, device_rows) in &grouped {
        let open_types = prior.get(device_id);
        let current_types: BTreeSet<String> = device_rows
            .iter()
            .map(|r| r.alarm_type.trim().to_string())
            .collect();

        let alarms = device_rows
            .iter()
            .map(|r| {
                let alarm_type = r.alarm_type.trim().to_string();
                let already_open = open_types.is_some_and(|t| t.contains(&alarm_type));
                AlarmUpsert {
                    alarm_type,
                    location: r.location.clone(),
                    occurred_at: r.occurred_at,
                    time_ago: r.time_ago.clone(),
                    append_history: !already_open,
                }
            })
            .collect();

        let cleared_types = open_types
            .map(|t| t.difference(&current_types).cloned().collect())
            .unwrap_or_default();

        alarming.push(DevicePlan {
            device_id: device_id.clone(),
            alarms,
            cleared_types,
        });
    }

    let devices_to_clear = prior
        .keys()
        .filter(|d| !grouped.contains_key(*d))
        .cloned()
        .collect();

    ReconcilePlan {
        alarming,
        devices_to_clear,
        dropped_rows: dropped,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
