use thiserror::Error;

use seedbed_core::{CoreError, FailureKind, Role};

/// Errors emitted by entity generators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("'{entity}' requires at least one '{parent}' record")]
    MissingDependency { entity: String, parent: String },
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("invalid count: {0}")]
    InvalidCount(String),
}

impl GenerationError {
    /// Outcome tag for this failure.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            GenerationError::MissingDependency { .. } => FailureKind::MissingDependency,
            GenerationError::NotSupported(_) => FailureKind::NotSupported,
            GenerationError::InvalidCount(_) => FailureKind::Unexpected,
        }
    }
}

/// Errors that escape a run instead of becoming outcomes.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("'{subject}' with role '{role}' may not manage fixtures")]
    Forbidden { subject: String, role: Role },
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}
