//! Handler for vendor alarm snapshot ingestion.

use axum::extract::State;
use axum::Json;

use crate::error::AppResult;
use crate::ingest::reconciler::{self, AlarmSnapshotInput, SnapshotOutcome};
use crate::middleware::auth::RequireAlarmIngest;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /ingest/alarms
///
/// Reconcile a full "currently alarming" snapshot. The authenticated key's
/// name identifies the source; snapshots per source are serialized.
pub async fn ingest_alarms(
    State(state): State<AppState>,
    RequireAlarmIngest(key): RequireAlarmIngest,
    Json(input): Json<AlarmSnapshotInput>,
) -> AppResult<Json<DataResponse<SnapshotOutcome>>> {
    tracing::debug!(
        source = %key.key_name,
        alarm_count = input.alarm_count,
        "Ingesting alarm snapshot",
    );

    let outcome = reconciler::ingest_snapshot(&state, &key.key_name, &input).await?;
    Ok(Json(DataResponse { data: outcome }))
}
