//! Handler for ping-sample batch ingestion.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::ingest::intake::{self, BatchOutcome, RawSampleInput};
use crate::middleware::auth::RequireSampleIngest;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /ingest/samples`.
#[derive(Debug, Deserialize)]
pub struct IngestSamplesRequest {
    /// Identifier of the submitting probe/agent, recorded on every sample.
    pub source: String,
    /// Ordered batch of raw samples.
    pub samples: Vec<RawSampleInput>,
}

/// POST /ingest/samples
///
/// Process a batch of reachability samples. Per-item failures (unknown
/// entity, storage error) accumulate in `errors` while the rest of the
/// batch proceeds.
pub async fn ingest_samples(
    State(state): State<AppState>,
    RequireSampleIngest(key): RequireSampleIngest,
    Json(input): Json<IngestSamplesRequest>,
) -> AppResult<Json<DataResponse<BatchOutcome>>> {
    if input.source.trim().is_empty() {
        return Err(AppError::BadRequest("source is required".to_string()));
    }
    if input.samples.is_empty() {
        return Err(AppError::BadRequest("samples must not be empty".to_string()));
    }

    tracing::debug!(
        source = %input.source,
        key_name = %key.key_name,
        batch_size = input.samples.len(),
        "Ingesting sample batch",
    );

    let outcome = intake::ingest_batch(&state, &input.source, &input.samples).await;
    Ok(Json(DataResponse { data: outcome }))
}
