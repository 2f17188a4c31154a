//! Persistence collaborators for Seedbed.
//!
//! Defines the `Store` contract, an in-memory store for dry runs and tests,
//! a Postgres store, and the resilient executor that classifies store errors.

pub mod error;
pub mod executor;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use executor::{ErrorClass, ExecContext, ExecError, ExecutionResult, classify, execute};
pub use memory::{MemoryStore, StoreAccess};
pub use postgres::{PostgresOptions, PostgresStore};
pub use store::{Store, WriteMode};
