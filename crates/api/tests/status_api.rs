//! Integration tests for single-entity status pushes and status queries.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{body_json, get_authed, post_json, seed_api_key, seed_entity};
use serde_json::json;
use sqlx::PgPool;
use uptrack_core::api_keys::scopes;
use uptrack_db::repositories::{SampleRepo, StatusLogRepo};

// ---------------------------------------------------------------------------
// Test: a push records a log entry and resolves the entity
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn push_records_log_entry(pool: PgPool) {
    seed_entity(&pool, "ATM", 10, "ATM010").await;
    let key = seed_api_key(&pool, "agent", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/v1/ingest/status/ATM010",
        &key,
        &json!({ "status": "SLOW", "message": "high latency on uplink" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["entity_id"], 10);
    assert_eq!(json["data"]["entity_type"], "ATM");
    assert_eq!(json["data"]["code"], "ATM010");
    assert_eq!(json["data"]["status"], "SLOW");

    let log = StatusLogRepo::latest_for_entity(&pool, "ATM", 10)
        .await
        .unwrap()
        .expect("log entry should exist");
    assert_eq!(log.raw_status, "SLOW");
    assert_eq!(log.message.as_deref(), Some("high latency on uplink"));

    // No metrics were pushed, so no detailed sample is recorded.
    let sample = SampleRepo::latest_for_entity(&pool, "ATM", 10).await.unwrap();
    assert!(sample.is_none());
}

// ---------------------------------------------------------------------------
// Test: a push with metrics also records a detailed sample
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn push_with_metrics_records_detailed_sample(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 11, "BR011").await;
    let key = seed_api_key(&pool, "agent", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/v1/ingest/status/BR011",
        &key,
        &json!({
            "status": "ONLINE",
            "latency_ms": 23,
            "packet_loss_pct": 0.5,
            "rtt_avg_ms": 21.7,
            "timestamp": Utc::now(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let sample = SampleRepo::latest_for_entity(&pool, "BRANCH", 11)
        .await
        .unwrap()
        .expect("detailed sample should exist");
    assert_eq!(sample.raw_status, "ONLINE");
    assert_eq!(sample.latency_ms, Some(23));
    assert_eq!(sample.rtt_avg_ms, Some(21.7));
    assert_eq!(sample.source, "push:agent");
}

// ---------------------------------------------------------------------------
// Test: the status query returns identity plus latest telemetry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_query_returns_latest_telemetry(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 12, "BR012").await;
    let push_key = seed_api_key(&pool, "agent", &[scopes::INGEST_SAMPLES]).await;
    let read_key = seed_api_key(&pool, "dashboard", &[scopes::READ_STATUS]).await;
    let app = common::build_test_app(pool.clone());

    post_json(
        app.clone(),
        "/api/v1/ingest/status/BR012",
        &push_key,
        &json!({ "status": "ONLINE", "latency_ms": 12 }),
    )
    .await;

    let response = get_authed(app, "/api/v1/entities/BR012/status", &read_key).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["data"]["entity"]["code"], "BR012");
    assert_eq!(json["data"]["entity"]["entity_type"], "BRANCH");
    assert_eq!(json["data"]["latest_log"]["raw_status"], "ONLINE");
    assert_eq!(json["data"]["latest_sample"]["latency_ms"], 12);
    // The push path does not feed the state tracker, so no state row exists.
    assert!(json["data"]["state"].is_null());
}

// ---------------------------------------------------------------------------
// Test: unknown entity code
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_code_returns_404(pool: PgPool) {
    let key = seed_api_key(&pool, "agent", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/v1/ingest/status/NOPE",
        &key,
        &json!({ "status": "ONLINE" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: the read scope is required for queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn query_requires_read_scope(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 13, "BR013").await;
    let push_key = seed_api_key(&pool, "agent", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let response = get_authed(app, "/api/v1/entities/BR013/status", &push_key).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
