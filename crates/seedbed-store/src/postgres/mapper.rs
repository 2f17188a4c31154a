use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use uuid::Uuid;

use seedbed_core::{EntityType, NewRecord, Record};

use crate::error::{StoreError, StoreResult};

/// Union of field and reference columns across a batch.
pub fn columns_of(records: &[NewRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|record| record.fields.keys().chain(record.references.keys()))
        .cloned()
        .collect()
}

/// Flatten candidates into the JSON objects fed to `jsonb_populate_recordset`.
pub fn records_to_payload(records: &[NewRecord]) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            let mut row: Map<String, Value> = record
                .fields
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            for (column, id) in &record.references {
                row.insert(column.clone(), Value::String(id.to_string()));
            }
            Value::Object(row)
        })
        .collect()
}

/// Split a `to_jsonb` row into id, parent references and plain fields.
pub fn row_to_record(entity: &EntityType, row: Value) -> StoreResult<Record> {
    let Value::Object(mut row) = row else {
        return Err(StoreError::Other(format!(
            "expected object row for {}",
            entity.name()
        )));
    };

    let id = row
        .remove("id")
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| {
            StoreError::Other(format!("row of {} has no uuid id", entity.name()))
        })?;

    let mut references = BTreeMap::new();
    for parent in entity.parents() {
        let column = EntityType::reference_column(parent);
        let Some(value) = row.remove(&column) else {
            continue;
        };
        if let Some(parent_id) = value.as_str().and_then(|raw| Uuid::parse_str(raw).ok()) {
            references.insert(column, parent_id);
        }
    }

    Ok(Record {
        id,
        fields: row.into_iter().collect(),
        references,
    })
}

#[cfg(test)]
mod tests {
    use seedbed_core::EntityKind;
    use serde_json::json;

    use super::*;

    #[test]
    fn row_splits_references_from_fields() {
        let entity = EntityType::new("content-item", EntityKind::ContentItem)
            .with_parents(["category"]);
        let id = Uuid::new_v4();
        let category = Uuid::new_v4();

        let record = row_to_record(
            &entity,
            json!({
                "id": id.to_string(),
                "category_id": category.to_string(),
                "title": "Hello",
                "view_count": 12
            }),
        )
        .unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.references.get("category_id"), Some(&category));
        assert_eq!(record.fields.get("title"), Some(&json!("Hello")));
        assert!(!record.fields.contains_key("category_id"));
    }

    #[test]
    fn payload_inlines_references() {
        let board = Uuid::new_v4();
        let records = vec![
            NewRecord::new().field("slug", "news").reference("board_id", board),
            NewRecord::new().field("name", "News"),
        ];

        let columns: Vec<String> = columns_of(&records).into_iter().collect();
        assert_eq!(columns, vec!["board_id", "name", "slug"]);

        let payload = records_to_payload(&records);
        assert_eq!(payload[0]["board_id"], json!(board.to_string()));
    }

    #[test]
    fn rows_without_ids_are_rejected() {
        let entity = EntityType::new("tag", EntityKind::Tag);
        assert!(row_to_record(&entity, json!({"name": "x"})).is_err());
    }
}
