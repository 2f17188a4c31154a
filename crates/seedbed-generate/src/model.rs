use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use seedbed_core::Outcome;

/// Options for the batch and preset orchestrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerOptions {
    /// Seed for generator randomness; a random seed is drawn when unset.
    pub seed: Option<u64>,
    /// Maximum parent records read back per parent type.
    pub parent_read_limit: usize,
    /// Count used when a generate request omits one.
    pub default_count: u64,
    /// Fixed clock for generated timestamps; wall clock when unset.
    #[serde(skip)]
    pub now: Option<DateTime<Utc>>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            seed: None,
            parent_read_limit: 500,
            default_count: 10,
            now: None,
        }
    }
}

/// Receives each outcome as soon as its entity-type step completes.
pub trait ProgressSink: Send {
    fn on_outcome(&mut self, outcome: &Outcome);
}

impl<F> ProgressSink for F
where
    F: FnMut(&Outcome) + Send,
{
    fn on_outcome(&mut self, outcome: &Outcome) {
        self(outcome)
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_outcome(&mut self, _outcome: &Outcome) {}
}

/// Forwards progress to a channel for live rendering elsewhere.
#[derive(Debug, Clone)]
pub struct ChannelProgress(pub UnboundedSender<Outcome>);

impl ProgressSink for ChannelProgress {
    fn on_outcome(&mut self, outcome: &Outcome) {
        // A closed receiver only means nobody is watching anymore.
        let _ = self.0.send(outcome.clone());
    }
}
