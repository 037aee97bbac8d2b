//! Append-only reachability samples.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uptrack_core::types::{DbId, Timestamp};

/// A row from the `samples` table (append-only; never updated or deleted).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Sample {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub ip_address: Option<String>,
    pub raw_status: String,
    pub latency_ms: Option<i32>,
    pub packet_loss_pct: Option<f64>,
    pub rtt_min_ms: Option<f64>,
    pub rtt_avg_ms: Option<f64>,
    pub rtt_max_ms: Option<f64>,
    pub checked_at: Timestamp,
    pub source: String,
    pub created_at: Timestamp,
}

/// DTO for inserting a sample.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSample {
    pub entity_type: String,
    pub entity_id: DbId,
    pub ip_address: Option<String>,
    pub raw_status: String,
    pub latency_ms: Option<i32>,
    pub packet_loss_pct: Option<f64>,
    pub rtt_min_ms: Option<f64>,
    pub rtt_avg_ms: Option<f64>,
    pub rtt_max_ms: Option<f64>,
    pub checked_at: Timestamp,
    pub source: String,
}
