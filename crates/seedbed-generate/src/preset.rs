use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use seedbed_core::{
    CoreError, Direction, EntityType, FailureKind, Operation, Outcome, Registry, Report,
    resolve_order,
};

use crate::batch::BatchRunner;
use crate::errors::FixtureError;
use crate::model::ProgressSink;

/// Per-entity-type target counts of one named scenario.
pub type PresetCounts = BTreeMap<String, u64>;

/// Named presets, loadable from the `[presets.*]` tables of `seedbed.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetCatalog {
    presets: BTreeMap<String, PresetCounts>,
}

impl Default for PresetCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.insert(
            "minimal",
            counts(&[("board", 2), ("category", 2), ("content-item", 2)]),
        );
        catalog.insert(
            "standard",
            counts(&[
                ("board", 3),
                ("category", 6),
                ("content-item", 24),
                ("tag", 12),
                ("comment", 48),
            ]),
        );
        catalog.insert(
            "full",
            counts(&[
                ("board", 4),
                ("category", 12),
                ("content-item", 60),
                ("tag", 20),
                ("group", 5),
                ("membership", 25),
                ("comment", 120),
                ("reaction", 80),
            ]),
        );
        catalog
    }
}

impl PresetCatalog {
    pub fn empty() -> Self {
        Self {
            presets: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PresetCounts> {
        self.presets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PresetCounts)> {
        self.presets.iter().map(|(name, counts)| (name.as_str(), counts))
    }

    /// Add or replace a preset.
    pub fn insert(&mut self, name: impl Into<String>, counts: PresetCounts) {
        self.presets.insert(name.into(), counts);
    }

    /// Fold `other` over this catalog; presets with the same name are replaced.
    pub fn merge(&mut self, other: PresetCatalog) {
        self.presets.extend(other.presets);
    }

    /// Every preset must only name registered entity types.
    pub fn validate(&self, registry: &Registry) -> Result<(), CoreError> {
        for (preset, counts) in &self.presets {
            for entity in counts.keys() {
                if registry.get(entity).is_none() {
                    return Err(CoreError::UnknownEntityType(format!(
                        "{entity} (preset '{preset}')"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn counts(pairs: &[(&str, u64)]) -> PresetCounts {
    pairs
        .iter()
        .map(|(entity, count)| (entity.to_string(), *count))
        .collect()
}

/// Runs the batch orchestrator across many entity types in dependency order.
#[derive(Clone)]
pub struct PresetRunner {
    batch: BatchRunner,
    catalog: PresetCatalog,
}

impl PresetRunner {
    pub fn new(batch: BatchRunner, catalog: PresetCatalog) -> Self {
        Self { batch, catalog }
    }

    pub fn batch(&self) -> &BatchRunner {
        &self.batch
    }

    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    /// Realize the named preset: generate each of its types in forward order.
    ///
    /// One failed type never blocks the rest. Each outcome reaches `progress`
    /// as soon as its step completes.
    pub async fn run_preset(
        &self,
        name: &str,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Report, FixtureError> {
        let counts = self
            .catalog
            .get(name)
            .ok_or_else(|| FixtureError::UnknownPreset(name.to_string()))?;

        let registry = self.batch.registry();
        let (targets, unknown): (Vec<&str>, Vec<&str>) = counts
            .keys()
            .map(String::as_str)
            .partition(|entity| registry.get(entity).is_some());
        // Unregistered types still get a step, reported as not supported.
        let order: Vec<&str> = resolve_order(registry, &targets, Direction::Forward)?
            .into_iter()
            .map(EntityType::name)
            .filter(|entity| counts.contains_key(*entity))
            .chain(unknown)
            .collect();

        info!(
            event = "preset_started",
            preset = name,
            seed = self.batch.seed(),
            steps = order.len()
        );

        let mut report = Report::new(Some(name.to_string()));
        for (index, entity) in order.iter().enumerate() {
            if cancel.is_cancelled() {
                cancel_remaining(&order[index..], Operation::Generate, &mut report, progress);
                break;
            }
            let count = counts.get(*entity).copied().unwrap_or_default();
            let outcome = self.batch.run_generate(entity, count).await;
            progress.on_outcome(&outcome);
            report.push(outcome);
        }

        info!(
            event = "preset_finished",
            preset = name,
            succeeded = report.succeeded(),
            failed = report.failed(),
            affected = report.affected_total()
        );
        Ok(report)
    }

    /// Clear every fixture-owned type, children before parents.
    pub async fn clear_all(
        &self,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Report, FixtureError> {
        let registry = self.batch.registry();
        let targets: Vec<&str> = registry.names().collect();
        let order: Vec<&str> = resolve_order(registry, &targets, Direction::Reverse)?
            .into_iter()
            .filter(|entity| !entity.is_externally_owned())
            .map(EntityType::name)
            .collect();

        info!(event = "clear_all_started", steps = order.len());

        let mut report = Report::new(None);
        for (index, entity) in order.iter().enumerate() {
            if cancel.is_cancelled() {
                cancel_remaining(&order[index..], Operation::Clear, &mut report, progress);
                break;
            }
            let outcome = self.batch.run_clear(entity).await;
            progress.on_outcome(&outcome);
            report.push(outcome);
        }

        info!(
            event = "clear_all_finished",
            succeeded = report.succeeded(),
            failed = report.failed(),
            deleted = report.affected_total()
        );
        Ok(report)
    }
}

fn cancel_remaining(
    remaining: &[&str],
    operation: Operation,
    report: &mut Report,
    progress: &mut dyn ProgressSink,
) {
    warn!(event = "run_cancelled", %operation, skipped = remaining.len());
    for entity in remaining {
        let outcome = Outcome::failed(
            *entity,
            operation,
            FailureKind::Cancelled,
            "run cancelled before this step started",
        );
        progress.on_outcome(&outcome);
        report.push(outcome);
    }
}

#[cfg(test)]
mod tests {
    use seedbed_core::default_entity_types;

    use super::*;

    #[test]
    fn default_catalog_matches_default_registry() {
        let registry = Registry::new(default_entity_types()).unwrap();
        let catalog = PresetCatalog::default();
        catalog.validate(&registry).unwrap();
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["full", "minimal", "standard"]
        );
        assert!(catalog.get("full").unwrap().keys().all(|name| name != "identity"));
    }

    #[test]
    fn unknown_types_are_rejected() {
        let registry = Registry::new(default_entity_types()).unwrap();
        let mut catalog = PresetCatalog::empty();
        catalog.insert("broken", counts(&[("widget", 1)]));
        assert!(matches!(
            catalog.validate(&registry),
            Err(CoreError::UnknownEntityType(_))
        ));
    }

    #[test]
    fn catalog_deserializes_from_named_tables() {
        let catalog: PresetCatalog = serde_json::from_value(serde_json::json!({
            "demo": { "board": 1, "tag": 4 }
        }))
        .unwrap();
        assert_eq!(catalog.get("demo").unwrap()["tag"], 4);

        let mut merged = PresetCatalog::default();
        merged.merge(catalog);
        assert_eq!(merged.names().count(), 4);
    }
}
