use async_trait::async_trait;

use seedbed_core::{EntityType, Filter, NewRecord, Record};

use crate::error::StoreResult;

/// How a write treats records whose natural key already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    Append,
    Upsert { natural_key: Vec<String> },
}

impl WriteMode {
    /// Upsert on the declared natural key, append otherwise.
    pub fn for_entity(entity: &EntityType) -> Self {
        match entity.natural_key() {
            Some(fields) => WriteMode::Upsert {
                natural_key: fields.to_vec(),
            },
            None => WriteMode::Append,
        }
    }
}

/// Persistence layer consumed by the orchestrators.
///
/// Every call blocks the caller until the store acknowledges it.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    async fn read(
        &self,
        entity: &EntityType,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Record>>;

    /// Persist `records`, returning them with store-assigned identifiers.
    async fn write(
        &self,
        entity: &EntityType,
        records: Vec<NewRecord>,
        mode: WriteMode,
    ) -> StoreResult<Vec<Record>>;

    /// Delete every stored record matching `filter`, returning the count.
    async fn delete(&self, entity: &EntityType, filter: &Filter) -> StoreResult<u64>;
}
