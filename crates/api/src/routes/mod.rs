pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ingest/samples                POST  ping-sample batch  (ingest:samples)
/// /ingest/status/{code}          POST  single-entity push (ingest:samples)
/// /ingest/alarms                 POST  alarm snapshot     (ingest:alarms)
///
/// /entities/{code}/status        GET   status query       (read:status)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/ingest", ingest_router())
        .nest("/entities", entities_router())
}

/// Ingestion routes mounted at `/ingest`.
fn ingest_router() -> Router<AppState> {
    Router::new()
        .route("/samples", post(handlers::samples::ingest_samples))
        .route("/status/{code}", post(handlers::status::push_status))
        .route("/alarms", post(handlers::alarms::ingest_alarms))
}

/// Entity query routes mounted at `/entities`.
fn entities_router() -> Router<AppState> {
    Router::new().route("/{code}/status", get(handlers::status::get_status))
}
