use thiserror::Error;

/// Configuration-time errors raised while building or walking the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The dependency graph induced by the requested types contains a cycle.
    #[error("cyclic dependency involving '{0}'")]
    CyclicDependency(String),
    /// A name was requested that the registry does not declare.
    #[error("unknown entity type '{0}'")]
    UnknownEntityType(String),
    /// The registry declaration violates one of its invariants.
    #[error("invalid registry: {0}")]
    InvalidRegistry(String),
}

/// Convenience alias for results returned by seedbed crates.
pub type Result<T> = std::result::Result<T, CoreError>;
