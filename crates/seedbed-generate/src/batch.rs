use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use seedbed_core::{
    EntityType, FailureKind, Filter, Operation, Outcome, Record, Registry, delete_filter,
};
use seedbed_store::{ExecContext, ExecError, Store, WriteMode, execute};

use crate::generators::{GeneratorContext, ParentRecords, generate};
use crate::model::RunnerOptions;

/// Outcome of one entity-type step plus the records it touched or observed.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub outcome: Outcome,
    pub records: Vec<Record>,
}

impl StepResult {
    fn bare(outcome: Outcome) -> Self {
        Self {
            outcome,
            records: Vec::new(),
        }
    }
}

/// Drives generate/clear for a single entity type.
///
/// Every store call goes through the resilient executor and every failure is
/// converted into a failed `Outcome`; nothing is thrown past this boundary.
#[derive(Clone)]
pub struct BatchRunner {
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    options: RunnerOptions,
    seed: u64,
}

impl BatchRunner {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn Store>, options: RunnerOptions) -> Self {
        let seed = options.seed.unwrap_or_else(rand::random);
        Self {
            registry,
            store,
            options,
            seed,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Seed actually used for generation in this runner.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub async fn run_generate(&self, entity_type: &str, count: u64) -> Outcome {
        self.generate_records(entity_type, count).await.outcome
    }

    pub async fn run_clear(&self, entity_type: &str) -> Outcome {
        self.clear_records(entity_type).await.outcome
    }

    /// Generate and write `count` records, returning the persisted records.
    pub async fn generate_records(&self, entity_type: &str, count: u64) -> StepResult {
        let Some(entity) = self.registry.get(entity_type) else {
            return StepResult::bare(not_supported(entity_type, Operation::Generate));
        };
        if entity.is_externally_owned() {
            return self.observe_external(entity, Operation::Generate).await;
        }

        let started = Instant::now();
        info!(event = "generate_started", entity = %entity.name(), count);

        let parents = match self.read_parents(entity).await {
            Ok(parents) => parents,
            Err(outcome) => return StepResult::bare(outcome),
        };

        let now = self.options.now.unwrap_or_else(Utc::now);
        let mut ctx = GeneratorContext::new(self.seed, entity.name(), now);
        let candidates = match generate(entity, count, &parents, &mut ctx) {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(event = "generate_failed", entity = %entity.name(), error = %err);
                return StepResult::bare(Outcome::failed(
                    entity.name(),
                    Operation::Generate,
                    err.failure_kind(),
                    err.to_string(),
                ));
            }
        };
        let requested = candidates.len();

        let written = execute(
            self.store
                .write(entity, candidates, WriteMode::for_entity(entity)),
            ExecContext::new(format!("write {}", entity.name())),
        )
        .await;

        match written {
            Ok(result) => {
                let affected = result.value.len() as u64;
                info!(
                    event = "records_written",
                    entity = %entity.name(),
                    affected,
                    duration_ms = started.elapsed().as_millis() as u64
                );
                let message = if entity.natural_key().is_some() {
                    format!("{affected} of {requested} records upserted")
                } else {
                    format!("{affected} records appended")
                };
                StepResult {
                    outcome: Outcome::success(entity.name(), Operation::Generate, affected, message),
                    records: result.value,
                }
            }
            Err(err) => StepResult::bare(exec_failure(entity, Operation::Generate, err)),
        }
    }

    /// Delete every record of `entity_type` except protected baseline records.
    pub async fn clear_records(&self, entity_type: &str) -> StepResult {
        let Some(entity) = self.registry.get(entity_type) else {
            return StepResult::bare(not_supported(entity_type, Operation::Clear));
        };
        if entity.is_externally_owned() {
            return self.observe_external(entity, Operation::Clear).await;
        }

        let filter = delete_filter(entity);
        let deleted = execute(
            self.store.delete(entity, &filter),
            ExecContext::new(format!("clear {}", entity.name())),
        )
        .await;

        match deleted {
            Ok(result) => {
                let message = if entity.protected_keys().is_empty() {
                    format!("{} records deleted", result.value)
                } else {
                    format!(
                        "{} records deleted, kept protected keys [{}]",
                        result.value,
                        join(entity.protected_keys().iter())
                    )
                };
                info!(event = "records_cleared", entity = %entity.name(), deleted = result.value);
                StepResult::bare(Outcome::success(
                    entity.name(),
                    Operation::Clear,
                    result.value,
                    message,
                ))
            }
            Err(err) => StepResult::bare(exec_failure(entity, Operation::Clear, err)),
        }
    }

    /// Read up to `limit` records of `entity_type`.
    pub async fn read_records(&self, entity_type: &str, limit: Option<usize>) -> StepResult {
        let Some(entity) = self.registry.get(entity_type) else {
            return StepResult::bare(not_supported(entity_type, Operation::Read));
        };

        let read = execute(
            self.store.read(entity, &Filter::All, limit),
            ExecContext::read(format!("read {}", entity.name())),
        )
        .await;

        match read {
            Ok(result) => {
                let visible = result.value.len();
                let message = if result.access_denied {
                    format!("access denied while reading {}; no rows visible", entity.name())
                } else {
                    format!("{visible} records read")
                };
                StepResult {
                    outcome: Outcome::success(entity.name(), Operation::Read, 0, message),
                    records: result.value,
                }
            }
            Err(err) => StepResult::bare(exec_failure(entity, Operation::Read, err)),
        }
    }

    async fn read_parents(&self, entity: &EntityType) -> Result<ParentRecords, Outcome> {
        let mut parents = ParentRecords::new();
        for parent_name in entity.parents() {
            let Some(parent) = self.registry.get(parent_name) else {
                return Err(not_supported(parent_name, Operation::Generate));
            };

            let read = execute(
                self.store
                    .read(parent, &Filter::All, Some(self.options.parent_read_limit)),
                ExecContext::read(format!("read {} for {}", parent.name(), entity.name())),
            )
            .await
            .map_err(|err| exec_failure(entity, Operation::Generate, err))?;

            if read.access_denied {
                info!(
                    event = "parents_hidden",
                    entity = %entity.name(),
                    parent = %parent.name()
                );
            }
            parents.insert(parent.name().to_string(), read.value);
        }
        Ok(parents)
    }

    /// Externally-owned types are never mutated; report what is there instead.
    async fn observe_external(&self, entity: &EntityType, operation: Operation) -> StepResult {
        let observed = self
            .read_records(entity.name(), Some(self.options.parent_read_limit))
            .await;
        let message = format!(
            "'{}' is externally owned; {} existing records left untouched",
            entity.name(),
            observed.records.len()
        );
        info!(event = "external_skipped", entity = %entity.name(), %operation);
        StepResult {
            outcome: Outcome::failed(entity.name(), operation, FailureKind::NotSupported, message),
            records: observed.records,
        }
    }
}

fn not_supported(entity_type: &str, operation: Operation) -> Outcome {
    warn!(event = "entity_unsupported", entity = %entity_type, %operation);
    Outcome::failed(
        entity_type,
        operation,
        FailureKind::NotSupported,
        format!("entity type '{entity_type}' is not supported"),
    )
}

fn exec_failure(entity: &EntityType, operation: Operation, err: ExecError) -> Outcome {
    let kind = match &err {
        ExecError::AccessDenied { .. } => FailureKind::AccessDenied,
        ExecError::Unexpected { .. } => FailureKind::Unexpected,
    };
    warn!(event = "step_failed", entity = %entity.name(), %operation, error = %err);
    Outcome::failed(entity.name(), operation, kind, err.to_string())
}

fn join<'a>(values: impl Iterator<Item = &'a String>) -> String {
    values.map(String::as_str).collect::<Vec<_>>().join(", ")
}
