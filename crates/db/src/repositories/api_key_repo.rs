//! Repository for the `api_keys` table (ingestion credentials).

use sqlx::PgPool;
use uptrack_core::types::DbId;

use crate::models::api_key::ApiKey;

const COLUMNS: &str = "\
    id, name, key_hash, key_prefix, scopes, is_active, \
    last_used_at, revoked_at, created_at";

/// Provides query operations for ingestion credentials.
pub struct ApiKeyRepo;

impl ApiKeyRepo {
    /// Look up an active, non-revoked key by the SHA-256 digest of its
    /// plaintext. Authentication hashes the presented key and calls this.
    pub async fn find_active_by_hash(
        pool: &PgPool,
        key_hash: &str,
    ) -> Result<Option<ApiKey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM api_keys \
             WHERE key_hash = $1 AND is_active = TRUE AND revoked_at IS NULL"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(key_hash)
            .fetch_optional(pool)
            .await
    }

    /// Stamp a key's last-used timestamp. Best-effort bookkeeping; callers
    /// ignore failures.
    pub async fn touch_last_used(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Insert a new key (provisioning tooling and tests).
    pub async fn insert(
        pool: &PgPool,
        name: &str,
        key_hash: &str,
        key_prefix: &str,
        scopes: &[String],
    ) -> Result<ApiKey, sqlx::Error> {
        let query = format!(
            "INSERT INTO api_keys (name, key_hash, key_prefix, scopes) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(name)
            .bind(key_hash)
            .bind(key_prefix)
            .bind(scopes)
            .fetch_one(pool)
            .await
    }
}
