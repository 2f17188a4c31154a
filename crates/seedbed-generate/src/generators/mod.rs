//! Entity generators.
//!
//! Generators synthesize candidate records from a count and the persisted
//! records of each parent type. Domain knowledge (weighted statuses, bounded
//! counters, vocabulary) lives here and nowhere else.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use seedbed_core::{EntityKind, EntityType, NewRecord, Record, RecordId};

use crate::errors::GenerationError;

pub mod domain;

/// Persisted records of each parent type, keyed by entity type name.
pub type ParentRecords = BTreeMap<String, Vec<Record>>;

/// Injected randomness and clock for one generation step.
#[derive(Debug, Clone)]
pub struct GeneratorContext {
    rng: ChaCha8Rng,
    now: DateTime<Utc>,
    cursors: BTreeMap<String, usize>,
}

impl GeneratorContext {
    /// Seed a context for `entity`; the same seed and entity reproduce output.
    pub fn new(seed: u64, entity: &str, now: DateTime<Utc>) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(hash_seed(seed, entity)),
            now,
            cursors: BTreeMap::new(),
        }
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// A timestamp up to `max_days` before now, at minute resolution.
    pub fn past(&mut self, max_days: i64) -> DateTime<Utc> {
        let minutes = self.rng.random_range(0..=max_days.max(0) * 24 * 60);
        self.now - Duration::minutes(minutes)
    }

    /// Pick one of `choices` proportionally to its weight.
    pub fn weighted<'c>(&mut self, choices: &[(&'c str, u32)]) -> &'c str {
        let total: u32 = choices.iter().map(|(_, weight)| weight).sum();
        if total == 0 {
            return choices.first().map(|(value, _)| *value).unwrap_or_default();
        }
        let mut roll = self.rng.random_range(0..total);
        for (value, weight) in choices {
            if roll < *weight {
                return *value;
            }
            roll -= weight;
        }
        choices.last().map(|(value, _)| *value).unwrap_or_default()
    }

    /// Identifier-safe token unique within `seen`.
    pub fn unique_token(&mut self, base: &str, seen: &mut HashSet<String>) -> String {
        loop {
            let token = format!("{base}-{:06x}", self.rng.random::<u32>() & 0x00ff_ffff);
            if seen.insert(token.clone()) {
                return token;
            }
        }
    }

    /// Round-robin over the parent records so children spread evenly.
    pub fn next_parent(&mut self, parent: &str, records: &[Record]) -> RecordId {
        let cursor = self.cursors.entry(parent.to_string()).or_insert(0);
        let record = &records[*cursor % records.len()];
        *cursor = (*cursor + 1) % records.len();
        record.id
    }

    /// Uniformly random parent record.
    pub fn any_parent(&mut self, records: &[Record]) -> RecordId {
        records[self.rng.random_range(0..records.len())].id
    }
}

/// Synthesize `count` candidate records of `entity` from `parents`.
///
/// Fails with `MissingDependency` before producing anything when a required
/// parent type has no records.
pub fn generate(
    entity: &EntityType,
    count: u64,
    parents: &ParentRecords,
    ctx: &mut GeneratorContext,
) -> Result<Vec<NewRecord>, GenerationError> {
    if entity.is_externally_owned() {
        return Err(GenerationError::NotSupported(format!(
            "'{}' is externally owned",
            entity.name()
        )));
    }

    let mut resolved: BTreeMap<&str, &[Record]> = BTreeMap::new();
    for parent in entity.parents() {
        match parents.get(parent) {
            Some(records) if !records.is_empty() => {
                resolved.insert(parent.as_str(), records.as_slice());
            }
            _ => {
                return Err(GenerationError::MissingDependency {
                    entity: entity.name().to_string(),
                    parent: parent.clone(),
                });
            }
        }
    }

    let count = usize::try_from(count)
        .map_err(|_| GenerationError::InvalidCount(format!("{count} exceeds platform limits")))?;
    // Kind generators name their parents; a registry may wire them differently.
    let parent = |name: &str| -> Result<&[Record], GenerationError> {
        match parents.get(name) {
            Some(records) if !records.is_empty() => Ok(records.as_slice()),
            _ => Err(GenerationError::MissingDependency {
                entity: entity.name().to_string(),
                parent: name.to_string(),
            }),
        }
    };

    let records = match entity.kind() {
        EntityKind::Board => domain::content::boards(count, ctx),
        EntityKind::Category => domain::content::categories(count, parent("board")?, ctx),
        EntityKind::ContentItem => domain::content::items(count, parent("category")?, ctx),
        EntityKind::Comment => domain::content::comments(
            count,
            parent("content-item")?,
            parent("identity")?,
            ctx,
        ),
        EntityKind::Reaction => domain::content::reactions(
            count,
            parent("content-item")?,
            parent("identity")?,
            ctx,
        ),
        EntityKind::Tag => domain::community::tags(count, ctx),
        EntityKind::Group => domain::community::groups(count, parent("identity")?, ctx),
        EntityKind::Membership => domain::community::memberships(
            count,
            parent("group")?,
            parent("identity")?,
            ctx,
        ),
        EntityKind::Generic => generic(entity, count, &resolved, ctx),
        EntityKind::Identity => {
            return Err(GenerationError::NotSupported(format!(
                "'{}' records are issued by the identity provider",
                entity.name()
            )));
        }
    };

    Ok(records)
}

/// Label-only records for custom registries, referencing each parent type.
fn generic(
    entity: &EntityType,
    count: usize,
    parents: &BTreeMap<&str, &[Record]>,
    ctx: &mut GeneratorContext,
) -> Vec<NewRecord> {
    let reference_columns: BTreeSet<String> = entity
        .parents()
        .iter()
        .map(|parent| EntityType::reference_column(parent))
        .collect();
    let key_fields: Vec<&String> = entity
        .natural_key()
        .unwrap_or_default()
        .iter()
        .filter(|field| !reference_columns.contains(*field))
        .collect();

    let mut seen = HashSet::new();
    (0..count)
        .map(|index| {
            let mut record = NewRecord::new()
                .field("label", format!("{} #{}", entity.name(), index + 1))
                .field("created_at", ctx.past(30).to_rfc3339());
            for field in &key_fields {
                let token = ctx.unique_token(field, &mut seen);
                record = record.field(field.as_str(), token);
            }
            for (parent, records) in parents {
                let id = ctx.next_parent(parent, records);
                record = record.reference(EntityType::reference_column(parent), id);
            }
            record
        })
        .collect()
}

/// Derive a per-entity seed from the run seed (FNV-1a over the name).
fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf2_9ce4_8422_2325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
