//! API-key authentication extractors.
//!
//! Every ingestion and query endpoint requires a pre-shared key presented as
//! `Authorization: Bearer <key>`. The key is hashed and looked up before any
//! persistence happens; a missing or unknown key rejects with 401 and a key
//! lacking the route's capability scope rejects with 403.
//!
//! Scope enforcement is expressed at the type level: each `Require*` struct
//! wraps [`ApiKeyAuth`] and names the capability a route needs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uptrack_core::api_keys::{self, scopes};
use uptrack_core::error::CoreError;
use uptrack_core::types::DbId;
use uptrack_db::repositories::ApiKeyRepo;

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated ingestion credential extracted from the `Authorization`
/// header.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    /// The key's database id.
    pub key_id: DbId,
    /// The key's human-readable name (for log attribution).
    pub key_name: String,
    /// Capability scopes granted to the key.
    pub scopes: Vec<String>,
}

impl ApiKeyAuth {
    fn require_scope(&self, scope: &str) -> Result<(), AppError> {
        if self.scopes.iter().any(|s| s == scope) {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(format!(
                "API key '{}' lacks the '{scope}' scope",
                self.key_name
            ))))
        }
    }
}

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let key = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <api key>".into(),
            ))
        })?;

        let hash = api_keys::hash_api_key(key);
        let api_key = ApiKeyRepo::find_active_by_hash(&state.pool, &hash)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Invalid or revoked API key".into()))
            })?;

        // Best-effort usage stamp; an error here must not fail the request.
        if let Err(err) = ApiKeyRepo::touch_last_used(&state.pool, api_key.id).await {
            tracing::warn!(error = %err, key_id = api_key.id, "Failed to stamp API key usage");
        }

        Ok(ApiKeyAuth {
            key_id: api_key.id,
            key_name: api_key.name,
            scopes: api_key.scopes,
        })
    }
}

/// Requires the `ingest:samples` scope (ping batches and status pushes).
pub struct RequireSampleIngest(pub ApiKeyAuth);

impl FromRequestParts<AppState> for RequireSampleIngest {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = ApiKeyAuth::from_request_parts(parts, state).await?;
        auth.require_scope(scopes::INGEST_SAMPLES)?;
        Ok(RequireSampleIngest(auth))
    }
}

/// Requires the `ingest:alarms` scope (vendor snapshot ingestion).
pub struct RequireAlarmIngest(pub ApiKeyAuth);

impl FromRequestParts<AppState> for RequireAlarmIngest {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = ApiKeyAuth::from_request_parts(parts, state).await?;
        auth.require_scope(scopes::INGEST_ALARMS)?;
        Ok(RequireAlarmIngest(auth))
    }
}

/// Requires the `read:status` scope (entity status queries).
pub struct RequireStatusRead(pub ApiKeyAuth);

impl FromRequestParts<AppState> for RequireStatusRead {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = ApiKeyAuth::from_request_parts(parts, state).await?;
        auth.require_scope(scopes::READ_STATUS)?;
        Ok(RequireStatusRead(auth))
    }
}
