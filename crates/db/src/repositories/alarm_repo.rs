//! Repository for the alarm feed tables: `device_records` (per-device
//! rollup), `alarm_records` (current state), and `alarm_history`
//! (append-only audit trail).

use sqlx::{PgConnection, PgPool};
use uptrack_core::types::Timestamp;

use crate::models::alarm::{AlarmHistoryEntry, AlarmRecord, DeviceRecord};

const DEVICE_COLUMNS: &str = "id, device_id, status, last_seen_at, updated_at";

const RECORD_COLUMNS: &str = "\
    id, device_id, alarm_type, location, occurred_at, time_ago, updated_at";

const HISTORY_COLUMNS: &str = "\
    id, device_id, alarm_type, location, occurred_at, cleared_at, \
    duration_seconds, created_at";

/// Provides query operations for the alarm feed tables.
pub struct AlarmRepo;

impl AlarmRepo {
    /// Serialize snapshot processing per source for the duration of the
    /// caller's transaction. Reconciliation reads the complete prior alarm
    /// set before writing the new one, so overlapping snapshots for the same
    /// source must not interleave.
    pub async fn lock_source(conn: &mut PgConnection, source: &str) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(source)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Load the prior alarm state: every device currently in ALARM paired
    /// with its open alarm types (NULL when the device has no current
    /// records, which should not happen but must not wedge reconciliation).
    pub async fn load_prior(
        conn: &mut PgConnection,
    ) -> Result<Vec<(String, Option<String>)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT d.device_id, r.alarm_type \
             FROM device_records d \
             LEFT JOIN alarm_records r ON r.device_id = d.device_id \
             WHERE d.status = 'ALARM'",
        )
        .fetch_all(conn)
        .await
    }

    /// Mark a device as alarming, inserting its rollup row if needed.
    pub async fn mark_device_alarming(
        conn: &mut PgConnection,
        device_id: &str,
        last_seen_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO device_records (device_id, status, last_seen_at) \
             VALUES ($1, 'ALARM', $2) \
             ON CONFLICT (device_id) DO UPDATE \
                SET status = 'ALARM', last_seen_at = $2, updated_at = NOW()",
        )
        .bind(device_id)
        .bind(last_seen_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Upsert the current-state record for one (device, alarm type).
    ///
    /// An ongoing alarm keeps its original `occurred_at`; only the display
    /// fields refresh with each snapshot.
    pub async fn upsert_alarm_record(
        conn: &mut PgConnection,
        device_id: &str,
        alarm_type: &str,
        location: Option<&str>,
        occurred_at: Timestamp,
        time_ago: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO alarm_records (device_id, alarm_type, location, occurred_at, time_ago) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (device_id, alarm_type) DO UPDATE \
                SET location = $3, time_ago = $5, updated_at = NOW()",
        )
        .bind(device_id)
        .bind(alarm_type)
        .bind(location)
        .bind(occurred_at)
        .bind(time_ago)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Append a history row for a newly-onset alarm.
    pub async fn append_history(
        conn: &mut PgConnection,
        device_id: &str,
        alarm_type: &str,
        location: Option<&str>,
        occurred_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO alarm_history (device_id, alarm_type, location, occurred_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(device_id)
        .bind(alarm_type)
        .bind(location)
        .bind(occurred_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Clear one alarm type on a device that is still alarming on others:
    /// stamp the open history row and delete the current-state record.
    ///
    /// `duration_seconds` is computed from the history row's own
    /// `occurred_at`, stamped exactly once.
    pub async fn clear_alarm_type(
        conn: &mut PgConnection,
        device_id: &str,
        alarm_type: &str,
        cleared_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE alarm_history \
             SET cleared_at = $3, \
                 duration_seconds = GREATEST(0, EXTRACT(EPOCH FROM ($3 - occurred_at))::BIGINT) \
             WHERE device_id = $1 AND alarm_type = $2 AND cleared_at IS NULL",
        )
        .bind(device_id)
        .bind(alarm_type)
        .bind(cleared_at)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM alarm_records WHERE device_id = $1 AND alarm_type = $2")
            .bind(device_id)
            .bind(alarm_type)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Clear a device entirely: flip the rollup to ONLINE, delete all its
    /// current-state records, and stamp all its open history rows.
    pub async fn clear_device(
        conn: &mut PgConnection,
        device_id: &str,
        cleared_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE device_records SET status = 'ONLINE', updated_at = NOW() \
             WHERE device_id = $1",
        )
        .bind(device_id)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            "UPDATE alarm_history \
             SET cleared_at = $2, \
                 duration_seconds = GREATEST(0, EXTRACT(EPOCH FROM ($2 - occurred_at))::BIGINT) \
             WHERE device_id = $1 AND cleared_at IS NULL",
        )
        .bind(device_id)
        .bind(cleared_at)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM alarm_records WHERE device_id = $1")
            .bind(device_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    // -- Read helpers (status queries and tests) ----------------------------

    /// Get a device rollup row by device id.
    pub async fn find_device(
        pool: &PgPool,
        device_id: &str,
    ) -> Result<Option<DeviceRecord>, sqlx::Error> {
        let query = format!("SELECT {DEVICE_COLUMNS} FROM device_records WHERE device_id = $1");
        sqlx::query_as::<_, DeviceRecord>(&query)
            .bind(device_id)
            .fetch_optional(pool)
            .await
    }

    /// List the current alarm records for a device.
    pub async fn list_records(
        pool: &PgPool,
        device_id: &str,
    ) -> Result<Vec<AlarmRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM alarm_records \
             WHERE device_id = $1 ORDER BY alarm_type"
        );
        sqlx::query_as::<_, AlarmRecord>(&query)
            .bind(device_id)
            .fetch_all(pool)
            .await
    }

    /// List the history rows for a device, newest first.
    pub async fn list_history(
        pool: &PgPool,
        device_id: &str,
    ) -> Result<Vec<AlarmHistoryEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM alarm_history \
             WHERE device_id = $1 ORDER BY occurred_at DESC, id DESC"
        );
        sqlx::query_as::<_, AlarmHistoryEntry>(&query)
            .bind(device_id)
            .fetch_all(pool)
            .await
    }
}
