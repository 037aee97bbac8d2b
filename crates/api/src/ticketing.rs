//! Ticketing collaborator boundary.
//!
//! On incident creation the correlator may request an external ticket. The
//! relationship is one-directional: the incident stores the returned ticket
//! reference for traceability, and nothing here ever reads ticket state
//! back. Ticket creation runs after the ingestion transaction commits and a
//! failure is logged, never surfaced to the ingestion caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uptrack_core::types::{DbId, Timestamp};

/// The ticket-creation request sent to the collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct TicketRequest {
    pub incident_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub entity_name: String,
    pub location: Option<String>,
    pub severity: String,
    pub detected_at: Timestamp,
}

/// The collaborator's reply.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketResponse {
    /// The external ticket identifier.
    pub ticket_ref: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("ticketing request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The outward collaborator interface. Implemented by the HTTP gateway in
/// production and by a disabled no-op when `TICKETING_URL` is unset.
#[async_trait]
pub trait TicketGateway: Send + Sync {
    /// Request ticket creation for a freshly opened incident. Returns the
    /// external ticket reference, or `None` when ticketing is disabled.
    async fn create_ticket(&self, request: &TicketRequest)
        -> Result<Option<TicketResponse>, TicketError>;
}

// ---------------------------------------------------------------------------
// HTTP gateway
// ---------------------------------------------------------------------------

/// Posts ticket requests to the configured collaborator endpoint.
pub struct HttpTicketGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpTicketGateway {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl TicketGateway for HttpTicketGateway {
    async fn create_ticket(
        &self,
        request: &TicketRequest,
    ) -> Result<Option<TicketResponse>, TicketError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<TicketResponse>()
            .await?;
        Ok(Some(response))
    }
}

// ---------------------------------------------------------------------------
// Disabled gateway
// ---------------------------------------------------------------------------

/// No-op gateway used when no ticketing endpoint is configured. Incidents
/// are still tracked; they simply carry no external ticket reference.
pub struct DisabledTicketGateway;

#[async_trait]
impl TicketGateway for DisabledTicketGateway {
    async fn create_ticket(
        &self,
        _request: &TicketRequest,
    ) -> Result<Option<TicketResponse>, TicketError> {
        Ok(None)
    }
}
