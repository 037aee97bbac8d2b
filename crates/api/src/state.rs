use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ticketing::TicketGateway;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: uptrack_db::DbPool,
    /// Server configuration (accessed by middleware and the ingest services).
    pub config: Arc<ServerConfig>,
    /// Ticketing collaborator used on incident creation.
    pub ticketing: Arc<dyn TicketGateway>,
}
