use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use seedbed_core::{EntityType, Registry, default_entity_types};
use seedbed_generate::{PresetCatalog, RunnerOptions};

use crate::CliError;

/// Contents of `seedbed.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedbedConfig {
    pub seed: Option<u64>,
    pub parent_read_limit: Option<usize>,
    pub default_count: Option<u64>,
    /// Postgres schema holding the entity tables.
    pub schema: Option<String>,
    /// Extra or replacement presets, merged over the built-in ones.
    pub presets: PresetCatalog,
    /// Protected natural-key values per entity type; replaces the defaults.
    pub protected: BTreeMap<String, Vec<String>>,
    /// Backing table names per entity type.
    pub tables: BTreeMap<String, String>,
}

impl SeedbedConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, CliError> {
        toml::from_str(contents).map_err(|err| CliError::InvalidConfig(err.to_string()))
    }

    /// The default registry with table and protection overrides applied.
    pub fn registry(&self) -> Result<Registry, CliError> {
        for name in self.protected.keys().chain(self.tables.keys()) {
            if !default_entity_types().iter().any(|entity| entity.name() == name) {
                return Err(CliError::InvalidConfig(format!(
                    "unknown entity type '{name}' in configuration"
                )));
            }
        }

        let entities: Vec<EntityType> = default_entity_types()
            .into_iter()
            .map(|entity| {
                let entity = match self.tables.get(entity.name()) {
                    Some(table) => entity.with_table(table.clone()),
                    None => entity,
                };
                match self.protected.get(entity.name()) {
                    Some(keys) => entity.with_protected_keys(keys.iter().cloned()),
                    None => entity,
                }
            })
            .collect();
        Ok(Registry::new(entities)?)
    }

    /// Built-in presets overlaid with the configured ones, checked against `registry`.
    pub fn catalog(&self, registry: &Registry) -> Result<PresetCatalog, CliError> {
        let mut catalog = PresetCatalog::default();
        catalog.merge(self.presets.clone());
        catalog.validate(registry)?;
        Ok(catalog)
    }

    pub fn runner_options(&self, seed_override: Option<u64>) -> RunnerOptions {
        let defaults = RunnerOptions::default();
        RunnerOptions {
            seed: seed_override.or(self.seed),
            parent_read_limit: self.parent_read_limit.unwrap_or(defaults.parent_read_limit),
            default_count: self.default_count.unwrap_or(defaults.default_count),
            now: None,
        }
    }
}
