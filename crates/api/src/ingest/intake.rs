//! Sample intake: turns a batch of raw reachability samples into state
//! updates, accounting credits, and incident transitions.
//!
//! Batches are processed sequentially with per-item failure isolation: an
//! unknown entity or a storage error on one sample is reported in the
//! result's `errors` list and the rest of the batch continues. Within one
//! sample, the state update, transition decision, and incident dedup check
//! are a single transaction holding the entity's state-row lock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uptrack_core::accounting::{credit_interval, Credit};
use uptrack_core::error::CoreError;
use uptrack_core::hysteresis::{apply_sample, TrackedState};
use uptrack_core::status::{EntityKind, RawStatus, StableState};
use uptrack_core::types::{DbId, Timestamp};
use uptrack_db::models::entity::MonitoredEntity;
use uptrack_db::models::sample::CreateSample;
use uptrack_db::repositories::{EntityRepo, EntityStateRepo, IncidentRepo, SampleRepo};

use crate::error::AppResult;
use crate::ingest::correlator::{self, IncidentOutcome};
use crate::state::AppState;
use crate::ticketing::TicketRequest;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// One raw sample in an ingestion batch.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSampleInput {
    pub entity_type: EntityKind,
    pub entity_id: DbId,
    pub ip_address: Option<String>,
    pub status: RawStatus,
    pub latency_ms: Option<i32>,
    pub packet_loss_pct: Option<f64>,
    pub rtt_min_ms: Option<f64>,
    pub rtt_avg_ms: Option<f64>,
    pub rtt_max_ms: Option<f64>,
    /// Probe timestamp; defaults to receipt time when omitted.
    pub timestamp: Option<Timestamp>,
}

/// Per-sample success entry in the batch result.
#[derive(Debug, Serialize)]
pub struct SampleResult {
    pub entity_type: EntityKind,
    pub entity_id: DbId,
    pub resulting_state: StableState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident: Option<IncidentOutcome>,
}

/// Per-sample error entry in the batch result. `index` is the sample's
/// position in the submitted batch so the caller can resend only the failed
/// subset.
#[derive(Debug, Serialize)]
pub struct SampleError {
    pub index: usize,
    pub entity_type: EntityKind,
    pub entity_id: DbId,
    pub error: String,
}

/// The full batch outcome: successes and failures accumulate side by side.
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub processed: usize,
    pub errors: Vec<SampleError>,
    pub results: Vec<SampleResult>,
}

// ---------------------------------------------------------------------------
// Batch ingestion
// ---------------------------------------------------------------------------

/// Process an ordered batch of samples from one source.
pub async fn ingest_batch(
    state: &AppState,
    source: &str,
    samples: &[RawSampleInput],
) -> BatchOutcome {
    let mut results = Vec::with_capacity(samples.len());
    let mut errors = Vec::new();

    for (index, input) in samples.iter().enumerate() {
        match process_sample(state, source, input).await {
            Ok(result) => results.push(result),
            Err(err) => {
                tracing::warn!(
                    entity_type = %input.entity_type.as_str(),
                    entity_id = input.entity_id,
                    index,
                    error = %err,
                    "Sample rejected",
                );
                errors.push(SampleError {
                    index,
                    entity_type: input.entity_type,
                    entity_id: input.entity_id,
                    error: err.to_string(),
                });
            }
        }
    }

    BatchOutcome {
        processed: results.len(),
        errors,
        results,
    }
}

/// Process one sample end to end.
async fn process_sample(
    state: &AppState,
    source: &str,
    input: &RawSampleInput,
) -> AppResult<SampleResult> {
    let kind = input.entity_type;
    let checked_at = input.timestamp.unwrap_or_else(Utc::now);

    let entity = EntityRepo::find_by_type_and_id(&state.pool, kind.as_str(), input.entity_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "MonitoredEntity",
            key: format!("{}/{}", kind.as_str(), input.entity_id),
        })?;

    let mut tx = state.pool.begin().await?;

    // Lock the state row for the whole decision: crediting, hysteresis, and
    // incident dedup must not interleave with a concurrent sample for the
    // same entity.
    let row = EntityStateRepo::lock_or_init(&mut *tx, kind.as_str(), entity.entity_id).await?;

    // Retroactive crediting: the interval since the previous check belongs
    // to whatever the entity was doing then, not to the new sample.
    let previous_status = row.raw_status.as_deref().map(RawStatus::from_str);
    let (uptime_credit, downtime_credit) =
        match credit_interval(previous_status, row.last_checked_at, checked_at) {
            Credit::Uptime(secs) => (secs, 0),
            Credit::Downtime(secs) => (0, secs),
            Credit::None => (0, 0),
        };

    let mut tracked = TrackedState {
        stable_state: StableState::from_str(&row.stable_state),
        consecutive_failures: row.consecutive_failures.max(0) as u32,
        consecutive_successes: row.consecutive_successes.max(0) as u32,
        down_since: row.down_since,
        last_state_change_at: row.last_state_change_at,
    };
    let transition = apply_sample(
        &mut tracked,
        input.status,
        checked_at,
        &state.config.monitor.debounce,
    );

    EntityStateRepo::store_sample_outcome(
        &mut *tx,
        row.id,
        input.status.as_str(),
        tracked.stable_state.as_str(),
        tracked.consecutive_failures as i32,
        tracked.consecutive_successes as i32,
        tracked.down_since,
        tracked.last_state_change_at,
        uptime_credit,
        downtime_credit,
        checked_at,
    )
    .await?;

    // The sample itself is persisted unconditionally, transition or not.
    SampleRepo::insert(
        &mut *tx,
        &CreateSample {
            entity_type: kind.as_str().to_string(),
            entity_id: entity.entity_id,
            ip_address: input.ip_address.clone().or_else(|| entity.ip_address.clone()),
            raw_status: input.status.as_str().to_string(),
            latency_ms: input.latency_ms,
            packet_loss_pct: input.packet_loss_pct,
            rtt_min_ms: input.rtt_min_ms,
            rtt_avg_ms: input.rtt_avg_ms,
            rtt_max_ms: input.rtt_max_ms,
            checked_at,
            source: source.to_string(),
        },
    )
    .await?;

    let incident = if transition.should_create_incident {
        Some(
            correlator::create_or_update(&mut *tx, &state.config.monitor, &entity, kind, checked_at)
                .await?,
        )
    } else if transition.should_resolve_incident {
        Some(correlator::resolve(&mut *tx, &entity, checked_at).await?)
    } else {
        None
    };

    tx.commit().await?;

    if let Some(IncidentOutcome::Created { incident_id }) = incident {
        request_ticket(state, incident_id, &entity).await;
    }

    Ok(SampleResult {
        entity_type: kind,
        entity_id: entity.entity_id,
        resulting_state: transition.state,
        incident,
    })
}

/// Request external ticket creation for a freshly opened incident.
///
/// Runs after the ingestion transaction committed so the collaborator call
/// never holds entity locks. Failures are logged and swallowed: ticket
/// retry belongs to operators, not to the ingestion path.
async fn request_ticket(state: &AppState, incident_id: DbId, entity: &MonitoredEntity) {
    let incident = match IncidentRepo::find_by_id(&state.pool, incident_id).await {
        Ok(Some(incident)) => incident,
        Ok(None) => return,
        Err(err) => {
            tracing::error!(incident_id, error = %err, "Failed to load incident for ticketing");
            return;
        }
    };

    let request = TicketRequest {
        incident_id,
        entity_type: entity.entity_type.clone(),
        entity_id: entity.entity_id,
        entity_name: entity.name.clone(),
        location: entity.location.clone(),
        severity: incident.severity.clone(),
        detected_at: incident.detected_at,
    };

    match state.ticketing.create_ticket(&request).await {
        Ok(Some(response)) => {
            if let Err(err) =
                IncidentRepo::set_ticket_ref(&state.pool, incident_id, &response.ticket_ref).await
            {
                tracing::error!(incident_id, error = %err, "Failed to store ticket reference");
            } else {
                tracing::info!(
                    incident_id,
                    ticket_ref = %response.ticket_ref,
                    "External ticket created",
                );
            }
        }
        Ok(None) => {} // ticketing disabled
        Err(err) => {
            tracing::error!(incident_id, error = %err, "Ticket creation failed");
        }
    }
}
