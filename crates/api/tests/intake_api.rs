//! Integration tests for ping-sample batch ingestion: hysteresis
//! transitions, incident lifecycle, uptime accounting, and per-item
//! partial-failure semantics.

mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use common::{body_json, post_json, post_json_unauthed, seed_api_key, seed_entity};
use serde_json::json;
use sqlx::PgPool;
use uptrack_core::api_keys::scopes;
use uptrack_db::repositories::EntityStateRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sample(entity_id: i64, status: &str, at: DateTime<Utc>) -> serde_json::Value {
    json!({
        "entity_type": "BRANCH",
        "entity_id": entity_id,
        "ip_address": "10.1.2.3",
        "status": status,
        "latency_ms": 42,
        "timestamp": at,
    })
}

fn batch(samples: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "source": "probe-test", "samples": samples })
}

async fn count_incidents(pool: &PgPool, entity_id: i64) -> i64 {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM incidents WHERE entity_type = 'BRANCH' AND entity_id = $1",
    )
    .bind(entity_id)
    .fetch_one(pool)
    .await
    .expect("incident count query should succeed");
    count
}

// ---------------------------------------------------------------------------
// Test: the full outage lifecycle
// ---------------------------------------------------------------------------

/// Entity starts Up; 3 consecutive Offline samples flip it Down and open
/// exactly one incident; a 4th Offline deduplicates; 2 consecutive Online
/// samples recover and resolve the incident.
#[sqlx::test(migrations = "../../db/migrations")]
async fn outage_lifecycle_opens_and_resolves_one_incident(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 1, "BR001").await;
    let key = seed_api_key(&pool, "probe", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let t0 = Utc::now() - Duration::minutes(10);

    // Three consecutive failures -> Down + one incident.
    let response = post_json(
        app.clone(),
        "/api/v1/ingest/samples",
        &key,
        &batch(vec![
            sample(1, "OFFLINE", t0),
            sample(1, "OFFLINE", t0 + Duration::minutes(1)),
            sample(1, "OFFLINE", t0 + Duration::minutes(2)),
        ]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["data"]["processed"], 3);
    let results = json["data"]["results"].as_array().unwrap();
    assert_eq!(results[0]["resulting_state"], "UP");
    assert_eq!(results[1]["resulting_state"], "UP");
    assert_eq!(results[2]["resulting_state"], "DOWN");
    assert_eq!(results[2]["incident"]["outcome"], "created");
    let incident_id = results[2]["incident"]["incident_id"].as_i64().unwrap();

    let state = EntityStateRepo::find(&pool, "BRANCH", 1)
        .await
        .unwrap()
        .expect("state row should exist");
    assert_eq!(state.stable_state, "DOWN");
    assert!(state.down_since.is_some(), "down_since must be set while Down");
    assert_eq!(count_incidents(&pool, 1).await, 1);

    // A 4th failure deduplicates against the open incident.
    let response = post_json(
        app.clone(),
        "/api/v1/ingest/samples",
        &key,
        &batch(vec![sample(1, "OFFLINE", t0 + Duration::minutes(3))]),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["results"][0]["incident"]["outcome"], "deduplicated");
    assert_eq!(
        json["data"]["results"][0]["incident"]["incident_id"].as_i64(),
        Some(incident_id)
    );
    assert_eq!(count_incidents(&pool, 1).await, 1, "no second incident");

    // Two consecutive successes -> Up + resolved.
    let response = post_json(
        app.clone(),
        "/api/v1/ingest/samples",
        &key,
        &batch(vec![
            sample(1, "ONLINE", t0 + Duration::minutes(4)),
            sample(1, "ONLINE", t0 + Duration::minutes(5)),
        ]),
    )
    .await;
    let json = body_json(response).await;
    let results = json["data"]["results"].as_array().unwrap();
    assert_eq!(results[0]["resulting_state"], "DOWN", "one success is not enough");
    assert_eq!(results[1]["resulting_state"], "UP");
    assert_eq!(results[1]["incident"]["outcome"], "resolved");

    let state = EntityStateRepo::find(&pool, "BRANCH", 1).await.unwrap().unwrap();
    assert_eq!(state.stable_state, "UP");
    assert!(state.down_since.is_none(), "down_since cleared on recovery");

    let (status, resolved_at): (String, Option<DateTime<Utc>>) =
        sqlx::query_as("SELECT status, resolved_at FROM incidents WHERE id = $1")
            .bind(incident_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "RESOLVED");
    assert!(resolved_at.is_some());
}

// ---------------------------------------------------------------------------
// Test: a single anomalous sample never flips state
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn flapping_samples_never_open_incidents(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 2, "BR002").await;
    let key = seed_api_key(&pool, "probe", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let t0 = Utc::now() - Duration::minutes(10);
    let statuses = ["OFFLINE", "ONLINE", "TIMEOUT", "ONLINE", "ERROR", "SLOW"];
    let samples = statuses
        .iter()
        .enumerate()
        .map(|(i, s)| sample(2, s, t0 + Duration::minutes(i as i64)))
        .collect();

    let response = post_json(app, "/api/v1/ingest/samples", &key, &batch(samples)).await;
    let json = body_json(response).await;

    for result in json["data"]["results"].as_array().unwrap() {
        assert_eq!(result["resulting_state"], "UP");
        assert!(result["incident"].is_null());
    }
    assert_eq!(count_incidents(&pool, 2).await, 0);
}

// ---------------------------------------------------------------------------
// Test: unknown entities fail per item, not per batch
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_entity_is_a_per_item_error(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 3, "BR003").await;
    let key = seed_api_key(&pool, "probe", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let t0 = Utc::now();
    let response = post_json(
        app,
        "/api/v1/ingest/samples",
        &key,
        &batch(vec![
            sample(3, "ONLINE", t0),
            sample(999, "ONLINE", t0), // not in the registry
            sample(3, "ONLINE", t0 + Duration::minutes(1)),
        ]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["data"]["processed"], 2);
    let errors = json["data"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["index"], 1, "error reports the failed position");
    assert_eq!(errors[0]["entity_id"], 999);
}

// ---------------------------------------------------------------------------
// Test: uptime/downtime accounting credits the previous classification
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn accounting_credits_previous_classification(pool: PgPool) {
    seed_entity(&pool, "ATM", 4, "ATM004").await;
    let key = seed_api_key(&pool, "probe", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let t0 = Utc::now() - Duration::minutes(10);
    let response = post_json(
        app,
        "/api/v1/ingest/samples",
        &key,
        &batch(vec![
            json!({"entity_type": "ATM", "entity_id": 4, "status": "ONLINE", "timestamp": t0}),
            // 60s since an ONLINE sample -> uptime, although now offline.
            json!({"entity_type": "ATM", "entity_id": 4, "status": "OFFLINE", "timestamp": t0 + Duration::seconds(60)}),
            // 90s since an OFFLINE sample -> downtime, although now online.
            json!({"entity_type": "ATM", "entity_id": 4, "status": "ONLINE", "timestamp": t0 + Duration::seconds(150)}),
        ]),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["processed"], 3);

    let state = EntityStateRepo::find(&pool, "ATM", 4).await.unwrap().unwrap();
    assert_eq!(state.uptime_seconds, 60);
    assert_eq!(state.downtime_seconds, 90);
    // The two buckets account for the full span between first and last sample.
    assert_eq!(state.uptime_seconds + state.downtime_seconds, 150);
}

// ---------------------------------------------------------------------------
// Test: credentials are enforced before any persistence
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_key_is_rejected_before_persistence(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 5, "BR005").await;
    let app = common::build_test_app(pool.clone());

    let response = post_json_unauthed(
        app,
        "/api/v1/ingest/samples",
        &batch(vec![sample(5, "ONLINE", Utc::now())]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM samples")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "nothing may be persisted without a credential");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn key_without_sample_scope_is_rejected(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 6, "BR006").await;
    // Key only carries the alarm scope.
    let key = seed_api_key(&pool, "vendor-feed", &[scopes::INGEST_ALARMS]).await;
    let app = common::build_test_app(pool.clone());

    let response = post_json(
        app,
        "/api/v1/ingest/samples",
        &key,
        &batch(vec![sample(6, "ONLINE", Utc::now())]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM samples")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// ---------------------------------------------------------------------------
// Test: concurrent Down signals for one entity create one incident
// ---------------------------------------------------------------------------

/// Two concurrent batches of failures for the same entity race through the
/// pipeline; the per-entity row lock serializes them and exactly one
/// incident is opened.
#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_failures_open_exactly_one_incident(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 8, "BR008").await;
    let key = seed_api_key(&pool, "probe", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let t0 = Utc::now() - Duration::minutes(10);
    let failures = |offset: i64| {
        batch(vec![
            sample(8, "OFFLINE", t0 + Duration::seconds(offset)),
            sample(8, "OFFLINE", t0 + Duration::seconds(offset + 10)),
            sample(8, "OFFLINE", t0 + Duration::seconds(offset + 20)),
        ])
    };

    let failures_0 = failures(0);
    let failures_5 = failures(5);
    let (a, b) = tokio::join!(
        post_json(app.clone(), "/api/v1/ingest/samples", &key, &failures_0),
        post_json(app.clone(), "/api/v1/ingest/samples", &key, &failures_5),
    );
    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);

    assert_eq!(
        count_incidents(&pool, 8).await,
        1,
        "interleaved Down signals must not create a second incident"
    );
}

// ---------------------------------------------------------------------------
// Test: mass-outage suppression
// ---------------------------------------------------------------------------

/// Once the trailing window holds the threshold number of freshly opened
/// incidents, further Down transitions are suppressed without a record.
#[sqlx::test(migrations = "../../db/migrations")]
async fn mass_outage_suppresses_incident_creation(pool: PgPool) {
    use uptrack_api::config::MonitorConfig;
    use uptrack_core::hysteresis::Debounce;

    for (id, code) in [(20, "BR020"), (21, "BR021"), (22, "BR022")] {
        seed_entity(&pool, "BRANCH", id, code).await;
    }
    let key = seed_api_key(&pool, "probe", &[scopes::INGEST_SAMPLES]).await;

    // F=1 so one failure transitions immediately; suppression kicks in after
    // 2 incidents in the window.
    let app = common::build_test_app_with_monitor(
        pool.clone(),
        MonitorConfig {
            debounce: Debounce {
                fail_threshold: 1,
                recover_threshold: 1,
            },
            suppression_window_secs: 3600,
            mass_outage_threshold: 2,
            repeat_incident_escalation: 3,
        },
    );

    let now = Utc::now();
    let response = post_json(
        app,
        "/api/v1/ingest/samples",
        &key,
        &batch(vec![
            sample(20, "OFFLINE", now),
            sample(21, "OFFLINE", now),
            sample(22, "OFFLINE", now),
        ]),
    )
    .await;
    let json = body_json(response).await;
    let results = json["data"]["results"].as_array().unwrap();

    assert_eq!(results[0]["incident"]["outcome"], "created");
    assert_eq!(results[1]["incident"]["outcome"], "created");
    assert_eq!(results[2]["incident"]["outcome"], "suppressed");

    // The suppressed transition left no incident row; the entity is still
    // tracked as Down.
    assert_eq!(count_incidents(&pool, 22).await, 0);
    let state = EntityStateRepo::find(&pool, "BRANCH", 22).await.unwrap().unwrap();
    assert_eq!(state.stable_state, "DOWN");
}

// ---------------------------------------------------------------------------
// Test: samples persist even without a transition
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn every_sample_is_persisted(pool: PgPool) {
    seed_entity(&pool, "BRANCH", 7, "BR007").await;
    let key = seed_api_key(&pool, "probe", &[scopes::INGEST_SAMPLES]).await;
    let app = common::build_test_app(pool.clone());

    let t0 = Utc::now();
    post_json(
        app,
        "/api/v1/ingest/samples",
        &key,
        &batch(vec![
            sample(7, "ONLINE", t0),
            sample(7, "OFFLINE", t0 + Duration::minutes(1)),
        ]),
    )
    .await;

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM samples WHERE entity_type = 'BRANCH' AND entity_id = 7",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 2);
}
