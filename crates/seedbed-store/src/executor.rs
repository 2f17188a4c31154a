use std::future::Future;

use thiserror::Error;
use tracing::{error, info};

use crate::error::{StoreError, StoreResult};

/// SQLSTATE raised by Postgres for privilege and row-level security rejections.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Whether a store failure is a benign permission rejection or a real failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    AccessDenied,
    Unexpected,
}

/// Classify a store error.
pub fn classify(error: &StoreError) -> ErrorClass {
    match error {
        StoreError::AccessDenied(_) => ErrorClass::AccessDenied,
        StoreError::Database(sqlx::Error::Database(db)) => {
            let message = db.message().to_lowercase();
            if db.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE)
                || message.contains("permission denied")
                || message.contains("row-level security")
            {
                ErrorClass::AccessDenied
            } else {
                ErrorClass::Unexpected
            }
        }
        _ => ErrorClass::Unexpected,
    }
}

/// Description and optional fallback for one persistence call.
#[derive(Debug, Clone)]
pub struct ExecContext<T> {
    description: String,
    fallback: Option<T>,
}

impl<T> ExecContext<T> {
    /// Context without a fallback: access denial is surfaced as an error.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<T: Default> ExecContext<T> {
    /// Read-path context: access denial yields an empty value.
    pub fn read(description: impl Into<String>) -> Self {
        Self::new(description).with_fallback(T::default())
    }
}

/// Value produced by `execute`, flagged when it came from the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult<T> {
    pub value: T,
    pub access_denied: bool,
}

/// Failure surfaced by `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("{description}: access denied ({message})")]
    AccessDenied {
        description: String,
        message: String,
    },
    #[error("{description}: {message}")]
    Unexpected {
        description: String,
        message: String,
    },
}

/// Run one persistence call and apply the access-denied policy.
pub async fn execute<T, F>(
    operation: F,
    context: ExecContext<T>,
) -> Result<ExecutionResult<T>, ExecError>
where
    F: Future<Output = StoreResult<T>>,
{
    let ExecContext {
        description,
        fallback,
    } = context;

    let err = match operation.await {
        Ok(value) => {
            return Ok(ExecutionResult {
                value,
                access_denied: false,
            });
        }
        Err(err) => err,
    };

    let message = err.to_string();
    match (classify(&err), fallback) {
        (ErrorClass::AccessDenied, Some(fallback)) => {
            info!(
                event = "access_denied",
                operation = %description,
                error = %message,
                "permission layer rejected call, using fallback"
            );
            Ok(ExecutionResult {
                value: fallback,
                access_denied: true,
            })
        }
        (ErrorClass::AccessDenied, None) => {
            info!(
                event = "access_denied",
                operation = %description,
                error = %message,
                "permission layer rejected call"
            );
            Err(ExecError::AccessDenied {
                description,
                message,
            })
        }
        (ErrorClass::Unexpected, _) => {
            error!(
                event = "store_failure",
                operation = %description,
                error = %message,
                "persistence call failed"
            );
            Err(ExecError::Unexpected {
                description,
                message,
            })
        }
    }
}
