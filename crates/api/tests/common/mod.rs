use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use uptrack_api::config::{MonitorConfig, ServerConfig};
use uptrack_api::router::build_app_router;
use uptrack_api::state::AppState;
use uptrack_api::ticketing::DisabledTicketGateway;
use uptrack_core::api_keys::generate_api_key;
use uptrack_db::repositories::ApiKeyRepo;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses the default monitor tuning (F=3, R=2) and no ticketing endpoint.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        monitor: MonitorConfig::default(),
        ticketing_url: None,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses. Ticketing is disabled.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ticketing: Arc::new(DisabledTicketGateway),
    };
    build_app_router(state, &config)
}

/// Build the application router with custom monitor tuning (debounce
/// thresholds, suppression policy). Ticketing stays disabled.
pub fn build_test_app_with_monitor(pool: PgPool, monitor: MonitorConfig) -> Router {
    let config = ServerConfig {
        monitor,
        ..test_config()
    };
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ticketing: Arc::new(DisabledTicketGateway),
    };
    build_app_router(state, &config)
}

/// Seed a registry entity. The registry is owned by the surrounding system,
/// so tests insert directly rather than through a repository.
pub async fn seed_entity(pool: &PgPool, entity_type: &str, entity_id: i64, code: &str) {
    sqlx::query(
        "INSERT INTO monitored_entities (entity_type, entity_id, code, name, location, ip_address) \
         VALUES ($1, $2, $3, $4, 'Test City', '10.0.0.1')",
    )
    .bind(entity_type)
    .bind(entity_id)
    .bind(code)
    .bind(format!("{entity_type} {code}"))
    .execute(pool)
    .await
    .expect("entity seed should succeed");
}

/// Seed an API key with the given capability scopes. Returns the plaintext
/// key for use in Authorization headers.
pub async fn seed_api_key(pool: &PgPool, name: &str, scopes: &[&str]) -> String {
    let generated = generate_api_key();
    let scopes: Vec<String> = scopes.iter().map(|s| (*s).to_string()).collect();
    ApiKeyRepo::insert(pool, name, &generated.hash, &generated.prefix, &scopes)
        .await
        .expect("API key seed should succeed");
    generated.plaintext
}

/// Perform an unauthenticated GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Perform a GET request with a Bearer API key.
pub async fn get_authed(app: Router, uri: &str, key: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("authorization", format!("Bearer {key}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Perform a JSON POST request with a Bearer API key.
pub async fn post_json(
    app: Router,
    uri: &str,
    key: &str,
    body: &serde_json::Value,
) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {key}"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Perform a JSON POST request without authentication.
pub async fn post_json_unauthed(app: Router, uri: &str, body: &serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
