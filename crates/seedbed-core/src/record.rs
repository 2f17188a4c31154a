use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Store-assigned record identifier.
pub type RecordId = Uuid;

/// A persisted instance of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Parent references keyed by reference column (e.g. `board_id`).
    #[serde(default)]
    pub references: BTreeMap<String, RecordId>,
}

impl Record {
    /// Textual value of a field or reference column, `None` when absent or null.
    pub fn value_of(&self, column: &str) -> Option<String> {
        if let Some(value) = self.fields.get(column) {
            return value_text(value);
        }
        self.references.get(column).map(Uuid::to_string)
    }

    /// Composite natural-key value, `None` when any component is missing.
    pub fn key_of(&self, fields: &[String]) -> Option<Vec<String>> {
        fields.iter().map(|field| self.value_of(field)).collect()
    }
}

/// Candidate record produced by a generator, not yet persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewRecord {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub references: BTreeMap<String, RecordId>,
}

impl NewRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn reference(mut self, column: impl Into<String>, id: RecordId) -> Self {
        self.references.insert(column.into(), id);
        self
    }

    /// Attach a store-assigned identifier.
    pub fn persist(self, id: RecordId) -> Record {
        Record {
            id,
            fields: self.fields,
            references: self.references,
        }
    }

    pub fn value_of(&self, column: &str) -> Option<String> {
        if let Some(value) = self.fields.get(column) {
            return value_text(value);
        }
        self.references.get(column).map(Uuid::to_string)
    }

    pub fn key_of(&self, fields: &[String]) -> Option<Vec<String>> {
        fields.iter().map(|field| self.value_of(field)).collect()
    }
}

/// Store-side predicate over records.
///
/// Comparisons are textual so the same filter can be rendered as SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    All,
    /// Matches records whose field is null or outside `values`.
    FieldNotIn {
        field: String,
        values: BTreeSet<String>,
    },
}

impl Filter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::FieldNotIn { field, values } => record
                .value_of(field)
                .is_none_or(|value| !values.contains(&value)),
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(slug: Option<&str>) -> Record {
        let mut candidate = NewRecord::new().field("name", "News");
        if let Some(slug) = slug {
            candidate = candidate.field("slug", slug);
        }
        candidate.persist(Uuid::new_v4())
    }

    #[test]
    fn value_of_reads_fields_and_references() {
        let board = Uuid::new_v4();
        let record = NewRecord::new()
            .field("score", 7)
            .field("deleted_at", Value::Null)
            .reference("board_id", board)
            .persist(Uuid::new_v4());

        assert_eq!(record.value_of("score").as_deref(), Some("7"));
        assert_eq!(record.value_of("deleted_at"), None);
        assert_eq!(record.value_of("board_id"), Some(board.to_string()));
        assert_eq!(record.value_of("missing"), None);
    }

    #[test]
    fn not_in_filter_keeps_null_keys_matching() {
        let filter = Filter::FieldNotIn {
            field: "slug".to_string(),
            values: BTreeSet::from(["alpha".to_string()]),
        };

        assert!(!filter.matches(&category(Some("alpha"))));
        assert!(filter.matches(&category(Some("gamma"))));
        assert!(filter.matches(&category(None)));
    }
}
