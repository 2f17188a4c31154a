//! Core contracts for Seedbed.
//!
//! This crate defines the entity type registry, records and outcomes, the
//! dependency resolver and the protected-data guard shared by the store,
//! generator and CLI crates.

pub mod entity;
pub mod error;
pub mod graph;
pub mod guard;
pub mod identity;
pub mod outcome;
pub mod record;
pub mod registry;

pub use entity::{EntityKind, EntityType, default_entity_types};
pub use error::{CoreError, Result};
pub use graph::{DependencyReport, Direction, dependency_report, resolve_order};
pub use guard::{delete_filter, is_protected};
pub use identity::{Identity, Role};
pub use outcome::{FailureKind, Operation, Outcome, Report};
pub use record::{Filter, NewRecord, Record, RecordId};
pub use registry::Registry;

/// Contract version stamped into `report.json` artifacts.
pub const REPORT_VERSION: &str = "0.1";
