use std::collections::{BTreeSet, HashMap};

use crate::entity::EntityType;
use crate::error::{CoreError, Result};
use crate::graph::{Direction, resolve_order};

/// Immutable, validated set of entity type declarations.
///
/// Declaration order is preserved and used to break ties when ordering.
#[derive(Debug, Clone)]
pub struct Registry {
    entities: Vec<EntityType>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Validate the declarations and freeze them.
    pub fn new(entities: Vec<EntityType>) -> Result<Self> {
        let mut index = HashMap::new();
        for (position, entity) in entities.iter().enumerate() {
            validate_identifier("entity type", entity.name(), true)?;
            validate_identifier("table", entity.table(), false)?;
            if index.insert(entity.name().to_string(), position).is_some() {
                return Err(CoreError::InvalidRegistry(format!(
                    "entity type '{}' declared twice",
                    entity.name()
                )));
            }
        }

        let registry = Self { entities, index };
        for entity in &registry.entities {
            registry.validate_entity(entity)?;
        }

        let all: Vec<&str> = registry.names().collect();
        resolve_order(&registry, &all, Direction::Forward)?;

        Ok(registry)
    }

    #[cfg(test)]
    pub(crate) fn unchecked(entities: Vec<EntityType>) -> Self {
        let index = entities
            .iter()
            .enumerate()
            .map(|(position, entity)| (entity.name().to_string(), position))
            .collect();
        Self { entities, index }
    }

    pub fn get(&self, name: &str) -> Option<&EntityType> {
        self.index.get(name).map(|position| &self.entities[*position])
    }

    /// Look up a type, failing with `UnknownEntityType`.
    pub fn require(&self, name: &str) -> Result<&EntityType> {
        self.get(name)
            .ok_or_else(|| CoreError::UnknownEntityType(name.to_string()))
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn entity_at(&self, position: usize) -> &EntityType {
        &self.entities[position]
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(EntityType::name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Positions of the declared parents of the entity at `position`.
    pub fn parent_positions(&self, position: usize) -> Vec<usize> {
        self.entities[position]
            .parents()
            .iter()
            .filter_map(|parent| self.position(parent))
            .collect()
    }

    /// Positions of the entities declaring the entity at `position` as a parent.
    pub fn child_positions(&self, position: usize) -> Vec<usize> {
        let name = self.entities[position].name();
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.parents().iter().any(|parent| parent == name))
            .map(|(child, _)| child)
            .collect()
    }

    fn validate_entity(&self, entity: &EntityType) -> Result<()> {
        let mut seen = BTreeSet::new();
        for parent in entity.parents() {
            if !self.index.contains_key(parent) {
                return Err(CoreError::InvalidRegistry(format!(
                    "'{}' depends on undeclared type '{}'",
                    entity.name(),
                    parent
                )));
            }
            if !seen.insert(parent) {
                return Err(CoreError::InvalidRegistry(format!(
                    "'{}' lists parent '{}' twice",
                    entity.name(),
                    parent
                )));
            }
        }

        for field in entity.natural_key().unwrap_or_default() {
            validate_identifier("natural key field", field, false)?;
        }

        if !entity.protected_keys().is_empty() && entity.protected_field().is_none() {
            return Err(CoreError::InvalidRegistry(format!(
                "'{}' declares protected keys without a single-field natural key",
                entity.name()
            )));
        }

        Ok(())
    }
}

fn validate_identifier(label: &str, value: &str, allow_dash: bool) -> Result<()> {
    let mut chars = value.chars();
    let valid_head = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_lowercase() || ch == '_');
    let valid_tail = chars.all(|ch| {
        ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || (allow_dash && ch == '-')
    });

    if valid_head && valid_tail {
        Ok(())
    } else {
        Err(CoreError::InvalidRegistry(format!(
            "{label} '{value}' is not a valid identifier"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, default_entity_types};

    #[test]
    fn default_registry_is_valid() {
        let registry = Registry::new(default_entity_types()).expect("default registry");
        assert_eq!(registry.len(), 9);
        assert!(registry.require("identity").unwrap().is_externally_owned());
        assert_eq!(registry.get("group").unwrap().table(), "user_group");
    }

    #[test]
    fn rejects_undeclared_parent() {
        let err = Registry::new(vec![
            EntityType::new("item", EntityKind::Generic).with_parents(["category"]),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRegistry(msg) if msg.contains("category")));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Registry::new(vec![
            EntityType::new("tag", EntityKind::Tag),
            EntityType::new("tag", EntityKind::Tag),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRegistry(_)));
    }

    #[test]
    fn rejects_unsafe_table_names() {
        let err = Registry::new(vec![
            EntityType::new("tag", EntityKind::Tag).with_table("tag; drop table x"),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRegistry(_)));
    }

    #[test]
    fn rejects_cycles_at_load() {
        let err = Registry::new(vec![
            EntityType::new("a", EntityKind::Generic).with_parents(["b"]),
            EntityType::new("b", EntityKind::Generic).with_parents(["a"]),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::CyclicDependency(_)));
    }

    #[test]
    fn child_positions_follow_declarations() {
        let registry = Registry::new(default_entity_types()).unwrap();
        let item = registry.position("content-item").unwrap();
        let children: Vec<&str> = registry
            .child_positions(item)
            .into_iter()
            .map(|position| registry.entity_at(position).name())
            .collect();
        assert_eq!(children, vec!["comment", "reaction"]);
    }
}
