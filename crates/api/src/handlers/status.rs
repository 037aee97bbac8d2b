//! Handlers for single-entity status pushes and status queries.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uptrack_core::error::CoreError;
use uptrack_core::status::RawStatus;
use uptrack_core::types::{DbId, Timestamp};
use uptrack_db::models::entity::MonitoredEntity;
use uptrack_db::models::entity_state::EntityState;
use uptrack_db::models::sample::{CreateSample, Sample};
use uptrack_db::models::status_log::StatusLog;
use uptrack_db::repositories::{
    EntityRepo, EntityStateRepo, SampleRepo, StatusLogRepo,
};

use crate::error::AppResult;
use crate::middleware::auth::{RequireSampleIngest, RequireStatusRead};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /ingest/status/{code}`.
#[derive(Debug, Deserialize)]
pub struct StatusPushRequest {
    pub status: RawStatus,
    pub message: Option<String>,
    pub latency_ms: Option<i32>,
    pub packet_loss_pct: Option<f64>,
    pub rtt_min_ms: Option<f64>,
    pub rtt_avg_ms: Option<f64>,
    pub rtt_max_ms: Option<f64>,
    /// Observation timestamp; defaults to receipt time.
    pub timestamp: Option<Timestamp>,
}

impl StatusPushRequest {
    /// Whether the push carries any probe metrics worth a detailed sample.
    fn has_metrics(&self) -> bool {
        self.latency_ms.is_some()
            || self.packet_loss_pct.is_some()
            || self.rtt_min_ms.is_some()
            || self.rtt_avg_ms.is_some()
            || self.rtt_max_ms.is_some()
    }
}

/// Response body for a status push.
#[derive(Debug, Serialize)]
pub struct StatusPushResponse {
    pub entity_id: DbId,
    pub entity_type: String,
    pub code: String,
    pub status: RawStatus,
}

/// Response body for a status query: identity plus the latest of each
/// telemetry stream.
#[derive(Debug, Serialize)]
pub struct EntityStatusResponse {
    pub entity: MonitoredEntity,
    pub state: Option<EntityState>,
    pub latest_log: Option<StatusLog>,
    pub latest_sample: Option<Sample>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /ingest/status/{code}
///
/// Record one status log entry for the entity resolved by code, plus a
/// detailed sample when the push carries metrics.
pub async fn push_status(
    State(state): State<AppState>,
    RequireSampleIngest(key): RequireSampleIngest,
    Path(code): Path<String>,
    Json(input): Json<StatusPushRequest>,
) -> AppResult<impl IntoResponse> {
    let entity = resolve_by_code(&state, &code).await?;
    let logged_at = input.timestamp.unwrap_or_else(Utc::now);

    StatusLogRepo::insert(
        &state.pool,
        &entity.entity_type,
        entity.entity_id,
        input.status.as_str(),
        input.message.as_deref(),
        logged_at,
    )
    .await?;

    if input.has_metrics() {
        let mut conn = state.pool.acquire().await?;
        SampleRepo::insert(
            &mut *conn,
            &CreateSample {
                entity_type: entity.entity_type.clone(),
                entity_id: entity.entity_id,
                ip_address: entity.ip_address.clone(),
                raw_status: input.status.as_str().to_string(),
                latency_ms: input.latency_ms,
                packet_loss_pct: input.packet_loss_pct,
                rtt_min_ms: input.rtt_min_ms,
                rtt_avg_ms: input.rtt_avg_ms,
                rtt_max_ms: input.rtt_max_ms,
                checked_at: logged_at,
                source: format!("push:{}", key.key_name),
            },
        )
        .await?;
    }

    tracing::debug!(
        code = %code,
        entity_id = entity.entity_id,
        status = input.status.as_str(),
        "Status push recorded",
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: StatusPushResponse {
                entity_id: entity.entity_id,
                entity_type: entity.entity_type,
                code: entity.code,
                status: input.status,
            },
        }),
    ))
}

/// GET /entities/{code}/status
///
/// Return the entity's identity, current tracking state, latest status log
/// entry, and latest detailed sample.
pub async fn get_status(
    State(state): State<AppState>,
    RequireStatusRead(_key): RequireStatusRead,
    Path(code): Path<String>,
) -> AppResult<Json<DataResponse<EntityStatusResponse>>> {
    let entity = resolve_by_code(&state, &code).await?;

    let state_row =
        EntityStateRepo::find(&state.pool, &entity.entity_type, entity.entity_id).await?;
    let latest_log =
        StatusLogRepo::latest_for_entity(&state.pool, &entity.entity_type, entity.entity_id)
            .await?;
    let latest_sample =
        SampleRepo::latest_for_entity(&state.pool, &entity.entity_type, entity.entity_id).await?;

    Ok(Json(DataResponse {
        data: EntityStatusResponse {
            entity,
            state: state_row,
            latest_log,
            latest_sample,
        },
    }))
}

/// Resolve an entity by code or fail with 404.
async fn resolve_by_code(state: &AppState, code: &str) -> AppResult<MonitoredEntity> {
    EntityRepo::find_by_code(&state.pool, code)
        .await?
        .ok_or_else(|| {
            crate::error::AppError::Core(CoreError::NotFound {
                entity: "MonitoredEntity",
                key: code.to_string(),
            })
        })
}
