use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Generator variant attached to an entity type.
///
/// Dispatch on this tag replaces string comparisons on entity names; custom
/// registries use `Generic` for types without domain-specific synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Identity,
    Board,
    Category,
    ContentItem,
    Tag,
    Group,
    Membership,
    Comment,
    Reaction,
    Generic,
}

/// Static declaration of a record category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct EntityType {
    name: String,
    table: String,
    kind: EntityKind,
    parents: Vec<String>,
    natural_key: Vec<String>,
    protected_keys: BTreeSet<String>,
    externally_owned: bool,
}

impl EntityType {
    /// Declare an entity type backed by a table derived from its name.
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        let name = name.into();
        let table = name.replace('-', "_");
        Self {
            name,
            table,
            kind,
            parents: Vec::new(),
            natural_key: Vec::new(),
            protected_keys: BTreeSet::new(),
            externally_owned: false,
        }
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_natural_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.natural_key = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the protected key set. An empty iterator clears protection.
    pub fn with_protected_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Mark the type as owned by a system outside this core.
    pub fn externally_owned(mut self) -> Self {
        self.externally_owned = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Natural key fields, when the type declares one.
    pub fn natural_key(&self) -> Option<&[String]> {
        if self.natural_key.is_empty() {
            None
        } else {
            Some(&self.natural_key)
        }
    }

    pub fn protected_keys(&self) -> &BTreeSet<String> {
        &self.protected_keys
    }

    /// Field holding the natural-key value checked against the protected set.
    pub fn protected_field(&self) -> Option<&str> {
        match (self.protected_keys.is_empty(), self.natural_key.as_slice()) {
            (false, [field]) => Some(field.as_str()),
            _ => None,
        }
    }

    pub fn is_externally_owned(&self) -> bool {
        self.externally_owned
    }

    /// Column on this type's records that references a record of `parent`.
    pub fn reference_column(parent: &str) -> String {
        format!("{}_id", parent.replace('-', "_"))
    }
}

/// Entity types of the content/grouping/membership/tagging application.
pub fn default_entity_types() -> Vec<EntityType> {
    vec![
        EntityType::new("identity", EntityKind::Identity)
            .with_natural_key(["handle"])
            .externally_owned(),
        EntityType::new("board", EntityKind::Board)
            .with_natural_key(["slug"])
            .with_protected_keys(["general"]),
        EntityType::new("category", EntityKind::Category)
            .with_parents(["board"])
            .with_natural_key(["slug"])
            .with_protected_keys(["general"]),
        EntityType::new("content-item", EntityKind::ContentItem).with_parents(["category"]),
        EntityType::new("tag", EntityKind::Tag).with_natural_key(["name"]),
        EntityType::new("group", EntityKind::Group)
            .with_parents(["identity"])
            .with_table("user_group"),
        EntityType::new("membership", EntityKind::Membership)
            .with_parents(["group", "identity"])
            .with_natural_key(["group_id", "identity_id"]),
        EntityType::new("comment", EntityKind::Comment).with_parents(["content-item", "identity"]),
        EntityType::new("reaction", EntityKind::Reaction)
            .with_parents(["content-item", "identity"])
            .with_natural_key(["content_item_id", "identity_id"]),
    ]
}
