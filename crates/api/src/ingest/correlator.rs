//! Incident correlation: exactly one tracked incident per real outage.

use chrono::Duration;
use serde::Serialize;
use sqlx::PgConnection;
use uptrack_core::status::{derive_severity, EntityKind};
use uptrack_core::types::{DbId, Timestamp};
use uptrack_db::models::entity::MonitoredEntity;
use uptrack_db::models::incident::CreateIncident;
use uptrack_db::repositories::IncidentRepo;

use crate::config::MonitorConfig;

/// Window for the repeat-offender escalation check.
const ESCALATION_LOOKBACK_HOURS: i64 = 24;

/// The outcome of feeding a state transition to the correlator, serialized
/// into per-sample ingestion results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IncidentOutcome {
    /// A new incident was opened.
    Created { incident_id: DbId },
    /// An active incident already covered this outage (flap-recover-flap).
    Deduplicated { incident_id: DbId },
    /// Creation was suppressed by the mass-outage policy; no record exists.
    Suppressed,
    /// The active incident was resolved.
    Resolved { incident_id: DbId },
    /// A resolve signal arrived with no active incident -- an expected
    /// concurrent-ingestion race, recorded as a no-op.
    NoActiveIncident,
}

/// Handle a Down transition: deduplicate, maybe suppress, otherwise open an
/// OPEN incident with derived severity.
///
/// Runs on the caller's transaction connection -- the dedup check must share
/// the transaction that holds the entity's state-row lock, or two
/// near-simultaneous Down signals could both pass it.
pub async fn create_or_update(
    conn: &mut PgConnection,
    config: &MonitorConfig,
    entity: &MonitoredEntity,
    kind: EntityKind,
    detected_at: Timestamp,
) -> Result<IncidentOutcome, sqlx::Error> {
    if let Some(existing) =
        IncidentRepo::find_active(conn, &entity.entity_type, entity.entity_id).await?
    {
        tracing::debug!(
            entity_type = %entity.entity_type,
            entity_id = entity.entity_id,
            incident_id = existing.id,
            "Down transition deduplicated against active incident",
        );
        return Ok(IncidentOutcome::Deduplicated {
            incident_id: existing.id,
        });
    }

    // Mass-outage suppression: when a correlated failure (backbone cut,
    // vendor-side outage) floods the window, stop opening incidents so the
    // ticketing collaborator sees a bounded burst.
    let window_start = detected_at - Duration::seconds(config.suppression_window_secs);
    let recent = IncidentRepo::count_opened_since(conn, window_start).await?;
    if recent >= config.mass_outage_threshold {
        tracing::warn!(
            entity_type = %entity.entity_type,
            entity_id = entity.entity_id,
            recent_incidents = recent,
            "Incident creation suppressed (mass outage window)",
        );
        return Ok(IncidentOutcome::Suppressed);
    }

    let lookback = detected_at - Duration::hours(ESCALATION_LOOKBACK_HOURS);
    let prior_incidents =
        IncidentRepo::count_for_entity_since(conn, &entity.entity_type, entity.entity_id, lookback)
            .await?;
    let severity = derive_severity(kind, prior_incidents, config.repeat_incident_escalation);

    let incident = IncidentRepo::create(
        conn,
        &CreateIncident {
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id,
            entity_name: entity.name.clone(),
            severity: severity.as_str().to_string(),
            detected_at,
        },
    )
    .await?;

    tracing::info!(
        entity_type = %entity.entity_type,
        entity_id = entity.entity_id,
        incident_id = incident.id,
        severity = %incident.severity,
        "Incident opened",
    );

    Ok(IncidentOutcome::Created {
        incident_id: incident.id,
    })
}

/// Handle an Up transition: resolve the active incident if one exists.
///
/// A missing incident is not an error -- concurrent ingestion races are
/// expected and resolve must be a silent no-op.
pub async fn resolve(
    conn: &mut PgConnection,
    entity: &MonitoredEntity,
    resolved_at: Timestamp,
) -> Result<IncidentOutcome, sqlx::Error> {
    match IncidentRepo::resolve_active(conn, &entity.entity_type, entity.entity_id, resolved_at)
        .await?
    {
        Some(incident) => {
            tracing::info!(
                entity_type = %entity.entity_type,
                entity_id = entity.entity_id,
                incident_id = incident.id,
                "Incident resolved",
            );
            Ok(IncidentOutcome::Resolved {
                incident_id: incident.id,
            })
        }
        None => Ok(IncidentOutcome::NoActiveIncident),
    }
}
