//! Read-only repository for the `monitored_entities` registry.

use sqlx::PgPool;
use uptrack_core::types::DbId;

use crate::models::entity::MonitoredEntity;

/// Column list for `monitored_entities` SELECT queries.
const COLUMNS: &str = "\
    id, entity_type, entity_id, code, name, location, ip_address, created_at";

/// Provides lookups against the entity registry. The registry is seeded by
/// the surrounding system; this service never writes to it.
pub struct EntityRepo;

impl EntityRepo {
    /// Resolve an entity by (type, external id).
    pub async fn find_by_type_and_id(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Option<MonitoredEntity>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM monitored_entities \
             WHERE entity_type = $1 AND entity_id = $2"
        );
        sqlx::query_as::<_, MonitoredEntity>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve an entity by its unique short code.
    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<MonitoredEntity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM monitored_entities WHERE code = $1");
        sqlx::query_as::<_, MonitoredEntity>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }
}
