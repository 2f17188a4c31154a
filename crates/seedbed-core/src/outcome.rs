use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operation an outcome reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Generate,
    Clear,
    Read,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Generate => write!(f, "generate"),
            Operation::Clear => write!(f, "clear"),
            Operation::Read => write!(f, "read"),
        }
    }
}

/// Classification attached to failed outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingDependency,
    AccessDenied,
    Unexpected,
    NotSupported,
    Cancelled,
}

/// Result of one entity-type operation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Outcome {
    entity_type: String,
    operation: Operation,
    succeeded: bool,
    affected_count: u64,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<FailureKind>,
    timestamp: DateTime<Utc>,
}

impl Outcome {
    pub fn success(
        entity_type: impl Into<String>,
        operation: Operation,
        affected_count: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            operation,
            succeeded: true,
            affected_count,
            message: message.into(),
            failure: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        entity_type: impl Into<String>,
        operation: Operation,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            operation,
            succeeded: false,
            affected_count: 0,
            message: message.into(),
            failure: Some(kind),
            timestamp: Utc::now(),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn affected_count(&self) -> u64 {
        self.affected_count
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Ordered outcomes of one run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    pub run_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    pub started_at: DateTime<Utc>,
    outcomes: Vec<Outcome>,
}

impl Report {
    pub fn new(preset: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            preset,
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    /// Append an outcome; earlier outcomes are never rewritten.
    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn affected_total(&self) -> u64 {
        self.outcomes.iter().map(Outcome::affected_count).sum()
    }
}
