use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use seedbed_core::{EntityType, Filter, NewRecord, Record};

use crate::error::{StoreError, StoreResult};
use crate::store::{Store, WriteMode};

/// Kind of call a `MemoryStore` denial or failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreAccess {
    Read,
    Write,
    Delete,
}

/// In-process store used for dry runs and tests.
///
/// Enforces natural-key uniqueness on appends the way a unique index would,
/// and can simulate permission rejections or outages per entity type.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, Vec<Record>>,
    denials: BTreeSet<(String, StoreAccess)>,
    failures: BTreeMap<(String, StoreAccess), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records directly, bypassing denials and failures.
    pub fn seed(&self, entity: &str, records: Vec<NewRecord>) -> StoreResult<Vec<Record>> {
        let mut state = self.lock()?;
        let table = state.tables.entry(entity.to_string()).or_default();
        let persisted: Vec<Record> = records
            .into_iter()
            .map(|record| record.persist(Uuid::new_v4()))
            .collect();
        table.extend(persisted.iter().cloned());
        Ok(persisted)
    }

    /// Drop every record of `entity`, bypassing the guard.
    pub fn truncate(&self, entity: &str) -> StoreResult<()> {
        self.lock()?.tables.remove(entity);
        Ok(())
    }

    pub fn records(&self, entity: &str) -> StoreResult<Vec<Record>> {
        Ok(self
            .lock()?
            .tables
            .get(entity)
            .cloned()
            .unwrap_or_default())
    }

    pub fn count(&self, entity: &str) -> StoreResult<usize> {
        Ok(self.lock()?.tables.get(entity).map_or(0, Vec::len))
    }

    /// Reject future `access` calls on `entity` as a permission layer would.
    pub fn deny(&self, entity: &str, access: StoreAccess) -> StoreResult<()> {
        self.lock()?.denials.insert((entity.to_string(), access));
        Ok(())
    }

    /// Fail future `access` calls on `entity` with an unexpected error.
    pub fn fail(&self, entity: &str, access: StoreAccess, message: &str) -> StoreResult<()> {
        self.lock()?
            .failures
            .insert((entity.to_string(), access), message.to_string());
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".to_string()))
    }
}

impl MemoryState {
    fn check(&self, entity: &str, access: StoreAccess) -> StoreResult<()> {
        let key = (entity.to_string(), access);
        if self.denials.contains(&key) {
            return Err(StoreError::AccessDenied(format!(
                "permission denied for {entity}"
            )));
        }
        if let Some(message) = self.failures.get(&key) {
            return Err(StoreError::Other(message.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn read(
        &self,
        entity: &EntityType,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Record>> {
        let state = self.lock()?;
        state.check(entity.name(), StoreAccess::Read)?;

        let records = state
            .tables
            .get(entity.name())
            .map(|rows| {
                rows.iter()
                    .filter(|record| filter.matches(record))
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn write(
        &self,
        entity: &EntityType,
        records: Vec<NewRecord>,
        mode: WriteMode,
    ) -> StoreResult<Vec<Record>> {
        let mut state = self.lock()?;
        state.check(entity.name(), StoreAccess::Write)?;

        let table = state.tables.entry(entity.name().to_string()).or_default();
        let mut written = Vec::with_capacity(records.len());

        for candidate in records {
            let existing = match (&mode, entity.natural_key()) {
                (WriteMode::Upsert { natural_key }, _) => {
                    find_by_key(table, natural_key, &candidate)
                }
                (WriteMode::Append, Some(natural_key)) => {
                    if find_by_key(table, natural_key, &candidate).is_some() {
                        return Err(StoreError::Other(format!(
                            "duplicate key value violates unique constraint on {}({})",
                            entity.table(),
                            natural_key.join(", ")
                        )));
                    }
                    None
                }
                (WriteMode::Append, None) => None,
            };

            let record = match existing {
                Some(position) => {
                    let id = table[position].id;
                    table[position] = candidate.persist(id);
                    table[position].clone()
                }
                None => {
                    let record = candidate.persist(Uuid::new_v4());
                    table.push(record.clone());
                    record
                }
            };
            written.push(record);
        }

        Ok(written)
    }

    async fn delete(&self, entity: &EntityType, filter: &Filter) -> StoreResult<u64> {
        let mut state = self.lock()?;
        state.check(entity.name(), StoreAccess::Delete)?;

        let Some(table) = state.tables.get_mut(entity.name()) else {
            return Ok(0);
        };
        let before = table.len();
        table.retain(|record| !filter.matches(record));
        Ok((before - table.len()) as u64)
    }
}

fn find_by_key(table: &[Record], natural_key: &[String], candidate: &NewRecord) -> Option<usize> {
    let key = candidate.key_of(natural_key)?;
    table
        .iter()
        .position(|record| record.key_of(natural_key).as_ref() == Some(&key))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use seedbed_core::EntityKind;

    use super::*;

    fn tag() -> EntityType {
        EntityType::new("tag", EntityKind::Tag).with_natural_key(["name"])
    }

    fn named(name: &str, color: &str) -> NewRecord {
        NewRecord::new().field("name", name).field("color", color)
    }

    #[tokio::test]
    async fn upsert_keeps_identifier_and_replaces_fields() {
        let store = MemoryStore::new();
        let entity = tag();
        let mode = WriteMode::for_entity(&entity);

        let first = store
            .write(&entity, vec![named("rust", "red")], mode.clone())
            .await
            .unwrap();
        let second = store
            .write(&entity, vec![named("rust", "blue")], mode)
            .await
            .unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_eq!(store.count("tag").unwrap(), 1);
        assert_eq!(
            store.records("tag").unwrap()[0].value_of("color").as_deref(),
            Some("blue")
        );
    }

    #[tokio::test]
    async fn append_rejects_duplicate_natural_keys() {
        let store = MemoryStore::new();
        let entity = tag();
        store
            .write(&entity, vec![named("rust", "red")], WriteMode::Append)
            .await
            .unwrap();

        let err = store
            .write(&entity, vec![named("rust", "red")], WriteMode::Append)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Other(msg) if msg.contains("unique")));
    }

    #[tokio::test]
    async fn delete_honours_filter_and_reports_count() {
        let store = MemoryStore::new();
        let entity = tag();
        store
            .seed("tag", vec![named("a", "x"), named("b", "x"), named("c", "x")])
            .unwrap();

        let filter = Filter::FieldNotIn {
            field: "name".to_string(),
            values: BTreeSet::from(["b".to_string()]),
        };
        assert_eq!(store.delete(&entity, &filter).await.unwrap(), 2);

        let left = store.records("tag").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].value_of("name").as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn denials_and_failures_are_tagged() {
        let store = MemoryStore::new();
        let entity = tag();
        store.deny("tag", StoreAccess::Read).unwrap();
        store.fail("tag", StoreAccess::Delete, "connection reset").unwrap();

        let read = store.read(&entity, &Filter::All, None).await.unwrap_err();
        assert!(matches!(read, StoreError::AccessDenied(_)));

        let delete = store.delete(&entity, &Filter::All).await.unwrap_err();
        assert!(matches!(delete, StoreError::Other(msg) if msg == "connection reset"));
    }

    #[tokio::test]
    async fn read_applies_limit() {
        let store = MemoryStore::new();
        store
            .seed("tag", vec![named("a", "x"), named("b", "x"), named("c", "x")])
            .unwrap();

        let rows = store.read(&tag(), &Filter::All, Some(2)).await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
