//! Invocation surface: the role gate plus request/response shapes.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use seedbed_core::{FailureKind, Identity, Operation, Record, Report};

use crate::batch::StepResult;
use crate::errors::FixtureError;
use crate::model::ProgressSink;
use crate::preset::PresetRunner;

/// One fixture request against a single entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub entity_type: String,
    pub operation: Operation,
    #[serde(default)]
    pub count: Option<u64>,
}

impl Request {
    pub fn generate(entity_type: impl Into<String>, count: u64) -> Self {
        Self {
            entity_type: entity_type.into(),
            operation: Operation::Generate,
            count: Some(count),
        }
    }

    pub fn clear(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            operation: Operation::Clear,
            count: None,
        }
    }

    pub fn read(entity_type: impl Into<String>, limit: Option<u64>) -> Self {
        Self {
            entity_type: entity_type.into(),
            operation: Operation::Read,
            count: limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub succeeded: bool,
    pub affected_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<Record>>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl From<StepResult> for Response {
    fn from(step: StepResult) -> Self {
        let outcome = step.outcome;
        let records = match outcome.operation() {
            Operation::Clear if step.records.is_empty() => None,
            _ => Some(step.records),
        };
        Self {
            succeeded: outcome.succeeded(),
            affected_count: outcome.affected_count(),
            records,
            message: outcome.message().to_string(),
            failure: outcome.failure(),
        }
    }
}

/// Role gate applied before any fixture component runs.
pub fn authorize(identity: &Identity) -> Result<(), FixtureError> {
    if identity.role.is_operator() {
        return Ok(());
    }
    warn!(event = "access_refused", subject = %identity.subject, role = %identity.role);
    Err(FixtureError::Forbidden {
        subject: identity.subject.clone(),
        role: identity.role,
    })
}

/// Fixture operations for an identity that already passed the role gate.
pub struct FixtureService {
    identity: Identity,
    runner: PresetRunner,
}

impl FixtureService {
    /// Admit `identity` only when its role is operator or above.
    pub fn new(identity: Identity, runner: PresetRunner) -> Result<Self, FixtureError> {
        authorize(&identity)?;
        info!(event = "access_granted", subject = %identity.subject, role = %identity.role);
        Ok(Self { identity, runner })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn runner(&self) -> &PresetRunner {
        &self.runner
    }

    pub async fn handle(&self, request: Request) -> Response {
        Response::from(self.dispatch(request).await)
    }

    /// Like `handle`, but keeps the step's `Outcome` for run reports.
    pub async fn dispatch(&self, request: Request) -> StepResult {
        let batch = self.runner.batch();
        info!(
            event = "request_received",
            subject = %self.identity.subject,
            entity = %request.entity_type,
            operation = %request.operation
        );
        match request.operation {
            Operation::Generate => {
                let count = request.count.unwrap_or(batch.options().default_count);
                batch.generate_records(&request.entity_type, count).await
            }
            Operation::Clear => batch.clear_records(&request.entity_type).await,
            Operation::Read => {
                let limit = request
                    .count
                    .and_then(|limit| usize::try_from(limit).ok())
                    .or(Some(batch.options().parent_read_limit));
                batch.read_records(&request.entity_type, limit).await
            }
        }
    }

    pub async fn run_preset(
        &self,
        name: &str,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Report, FixtureError> {
        self.runner.run_preset(name, progress, cancel).await
    }

    pub async fn clear_all(
        &self,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Report, FixtureError> {
        self.runner.clear_all(progress, cancel).await
    }
}
