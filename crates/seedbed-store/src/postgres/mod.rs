use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use seedbed_core::{EntityType, Filter, NewRecord, Record};

use crate::error::StoreResult;
use crate::store::{Store, WriteMode};

mod mapper;
mod queries;

/// Connection options for the Postgres store.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    /// Schema holding the entity tables.
    pub schema: String,
    pub max_connections: u32,
    /// Pool acquire timeout; the only timeout applied to store calls.
    pub acquire_timeout: Duration,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Store backed by one Postgres table per entity type.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    schema: String,
}

impl PostgresStore {
    /// Create a store using a pre-configured pool.
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Connect a pool with the given options.
    pub async fn connect(url: &str, options: &PostgresOptions) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool, options.schema.clone()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn read(
        &self,
        entity: &EntityType,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Record>> {
        let mut query = queries::select_rows(&self.schema, entity, filter, limit);
        let rows: Vec<serde_json::Value> = query
            .build_query_scalar::<serde_json::Value>()
            .fetch_all(&self.pool)
            .await?;
        debug!(entity = %entity.name(), rows = rows.len(), "rows read");
        rows.into_iter()
            .map(|row| mapper::row_to_record(entity, row))
            .collect()
    }

    async fn write(
        &self,
        entity: &EntityType,
        records: Vec<NewRecord>,
        mode: WriteMode,
    ) -> StoreResult<Vec<Record>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let columns = mapper::columns_of(&records);
        let payload = mapper::records_to_payload(&records);
        let mut query = queries::insert_rows(&self.schema, entity, &columns, payload, &mode);
        let rows: Vec<serde_json::Value> = query
            .build_query_scalar::<serde_json::Value>()
            .fetch_all(&self.pool)
            .await?;
        debug!(entity = %entity.name(), rows = rows.len(), "rows written");
        rows.into_iter()
            .map(|row| mapper::row_to_record(entity, row))
            .collect()
    }

    async fn delete(&self, entity: &EntityType, filter: &Filter) -> StoreResult<u64> {
        let mut query = queries::delete_rows(&self.schema, entity, filter);
        let result = query.build().execute(&self.pool).await?;
        debug!(entity = %entity.name(), rows = result.rows_affected(), "rows deleted");
        Ok(result.rows_affected())
    }
}
