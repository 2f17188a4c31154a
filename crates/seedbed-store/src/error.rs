use thiserror::Error;

/// Errors raised by a persistence call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The permission layer rejected the call.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// Errors returned by `sqlx` when executing queries.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Row payload could not be converted.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A requested capability is not implemented by this store.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Catch-all for other store failures (constraint violations, poisoning).
    #[error("store error: {0}")]
    Other(String),
}

/// Convenience alias for store results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
