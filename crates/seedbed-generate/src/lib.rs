//! Fixture generation and lifecycle orchestration for Seedbed.
//!
//! Generators synthesize records from persisted parents, the batch runner
//! drives one entity type through the resilient executor, and the preset
//! runner sequences many types in dependency order.

pub mod batch;
pub mod errors;
pub mod generators;
pub mod model;
pub mod preset;
pub mod service;

pub use batch::{BatchRunner, StepResult};
pub use errors::{FixtureError, GenerationError};
pub use generators::{GeneratorContext, ParentRecords, generate};
pub use model::{ChannelProgress, NoProgress, ProgressSink, RunnerOptions};
pub use preset::{PresetCatalog, PresetCounts, PresetRunner};
pub use service::{FixtureService, Request, Response, authorize};
