//! Alarm snapshot ingestion: full-set reconciliation against the prior
//! alarm state.
//!
//! A snapshot is rejected wholesale when its declared alarm count does not
//! match the submitted rows -- a truncated snapshot must never be diffed,
//! because every device it accidentally omits would be inferred cleared.
//! Once accepted, processing is best-effort per device: each device's
//! operations run in a savepoint, and a storage failure on one device is
//! reported without aborting the rest of the snapshot.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Acquire;
use uptrack_core::error::CoreError;
use uptrack_core::reconcile::{self, PriorAlarms, SnapshotRow};
use uptrack_core::types::Timestamp;
use uptrack_db::repositories::AlarmRepo;

use crate::error::AppResult;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// One alarm row in a vendor snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotAlarmInput {
    pub device_id: String,
    pub alarm_type: String,
    pub location: Option<String>,
    /// When the alarm began, per the vendor; defaults to the snapshot
    /// timestamp when omitted.
    pub timestamp: Option<Timestamp>,
    pub time_ago: Option<String>,
}

/// A full "currently alarming" snapshot from the vendor feed.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmSnapshotInput {
    /// When the vendor produced the snapshot; defaults to receipt time.
    pub timestamp: Option<Timestamp>,
    /// Declared row count; must match `alarms.len()` exactly.
    pub alarm_count: usize,
    pub alarms: Vec<SnapshotAlarmInput>,
}

/// Per-device failure entry for rows accepted but not applied.
#[derive(Debug, Serialize)]
pub struct SnapshotError {
    pub device_id: String,
    pub error: String,
}

/// The result of one snapshot ingestion.
#[derive(Debug, Serialize)]
pub struct SnapshotOutcome {
    /// Alarm rows applied (after normalization drops and device failures).
    pub processed_count: usize,
    /// Devices alarming in this snapshot.
    pub devices_alarming: usize,
    /// Devices inferred cleared because the snapshot omits them.
    pub devices_cleared: usize,
    pub cleared_devices: Vec<String>,
    /// Rows dropped during normalization (empty device id or alarm type).
    pub dropped_rows: usize,
    pub errors: Vec<SnapshotError>,
}

// ---------------------------------------------------------------------------
// Snapshot ingestion
// ---------------------------------------------------------------------------

/// Ingest one vendor snapshot for the given source.
///
/// Snapshots for the same source are serialized via a transaction-scoped
/// advisory lock: reconciliation reads the complete prior alarm set before
/// writing the new one, so two overlapping snapshots must not interleave.
pub async fn ingest_snapshot(
    state: &AppState,
    source: &str,
    input: &AlarmSnapshotInput,
) -> AppResult<SnapshotOutcome> {
    if input.alarm_count != input.alarms.len() {
        return Err(CoreError::Validation(format!(
            "alarm_count {} does not match submitted rows {}",
            input.alarm_count,
            input.alarms.len()
        ))
        .into());
    }

    let received_at = input.timestamp.unwrap_or_else(Utc::now);

    let rows: Vec<SnapshotRow> = input
        .alarms
        .iter()
        .map(|a| SnapshotRow {
            device_id: a.device_id.clone(),
            alarm_type: a.alarm_type.clone(),
            location: a.location.clone(),
            occurred_at: a.timestamp.unwrap_or(received_at),
            time_ago: a.time_ago.clone(),
        })
        .collect();

    let mut tx = state.pool.begin().await?;
    AlarmRepo::lock_source(&mut *tx, source).await?;

    let prior_rows = AlarmRepo::load_prior(&mut *tx).await?;
    let mut prior = PriorAlarms::new();
    for (device_id, alarm_type) in prior_rows {
        let types = prior.entry(device_id).or_default();
        if let Some(alarm_type) = alarm_type {
            types.insert(alarm_type);
        }
    }

    let plan = reconcile::plan(&prior, &rows);

    let mut processed = 0usize;
    let mut errors = Vec::new();

    for device in &plan.alarming {
        match apply_device(&mut tx, device, received_at).await {
            Ok(applied) => processed += applied,
            Err(err) => {
                tracing::error!(
                    device_id = %device.device_id,
                    error = %err,
                    "Failed to apply snapshot rows for device",
                );
                errors.push(SnapshotError {
                    device_id: device.device_id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    for device_id in &plan.devices_to_clear {
        match clear_device(&mut tx, device_id, received_at).await {
            Ok(()) => {}
            Err(err) => {
                tracing::error!(
                    device_id = %device_id,
                    error = %err,
                    "Failed to clear device",
                );
                errors.push(SnapshotError {
                    device_id: device_id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    tx.commit().await?;

    tracing::info!(
        source,
        devices_alarming = plan.alarming.len(),
        devices_cleared = plan.devices_to_clear.len(),
        dropped_rows = plan.dropped_rows,
        "Alarm snapshot reconciled",
    );

    Ok(SnapshotOutcome {
        processed_count: processed,
        devices_alarming: plan.alarming.len(),
        devices_cleared: plan.devices_to_clear.len(),
        cleared_devices: plan.devices_to_clear.clone(),
        dropped_rows: plan.dropped_rows,
        errors,
    })
}

/// Apply one alarming device's operations inside a savepoint. Returns the
/// number of alarm rows applied.
async fn apply_device(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    device: &reconcile::DevicePlan,
    received_at: Timestamp,
) -> Result<usize, sqlx::Error> {
    let mut sp = tx.begin().await?;

    AlarmRepo::mark_device_alarming(&mut *sp, &device.device_id, received_at).await?;

    for alarm in &device.alarms {
        AlarmRepo::upsert_alarm_record(
            &mut *sp,
            &device.device_id,
            &alarm.alarm_type,
            alarm.location.as_deref(),
            alarm.occurred_at,
            alarm.time_ago.as_deref(),
        )
        .await?;

        if alarm.append_history {
            AlarmRepo::append_history(
                &mut *sp,
                &device.device_id,
                &alarm.alarm_type,
                alarm.location.as_deref(),
                alarm.occurred_at,
            )
            .await?;
        }
    }

    for alarm_type in &device.cleared_types {
        AlarmRepo::clear_alarm_type(&mut *sp, &device.device_id, alarm_type, received_at).await?;
    }

    sp.commit().await?;
    Ok(device.alarms.len())
}

/// Clear one silently-absent device inside a savepoint.
async fn clear_device(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    device_id: &str,
    received_at: Timestamp,
) -> Result<(), sqlx::Error> {
    let mut sp = tx.begin().await?;
    AlarmRepo::clear_device(&mut *sp, device_id, received_at).await?;
    sp.commit().await?;
    Ok(())
}
