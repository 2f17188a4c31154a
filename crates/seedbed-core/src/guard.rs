//! Exclusion rules for baseline records that must survive bulk deletes.

use crate::entity::EntityType;
use crate::record::{Filter, Record};

/// Whether `record` carries one of the type's protected natural-key values.
pub fn is_protected(entity: &EntityType, record: &Record) -> bool {
    let Some(field) = entity.protected_field() else {
        return false;
    };
    record
        .value_of(field)
        .is_some_and(|value| entity.protected_keys().contains(&value))
}

/// Delete predicate for a bulk clear of `entity`.
///
/// The exclusion is part of the predicate itself, so the store evaluates it
/// against the full stored collection.
pub fn delete_filter(entity: &EntityType) -> Filter {
    match entity.protected_field() {
        Some(field) => Filter::FieldNotIn {
            field: field.to_string(),
            values: entity.protected_keys().clone(),
        },
        None => Filter::All,
    }
}
