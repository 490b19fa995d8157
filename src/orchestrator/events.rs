/*!
 * Progress events emitted by a running batch.
 *
 * The batch engine reports through a caller-supplied callback, so the CLI
 * can drive a progress bar and persist checkpoints without the engine
 * knowing about either.
 */

use std::time::{Duration, Instant};

use crate::project::{ProjectState, UnitId};

/// One progress notification from a batch run
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Batch started; `total` units are queued
    Started {
        /// Units in the queue
        total: usize,
    },

    /// One unit finished successfully
    UnitCompleted {
        /// Completed unit
        id: UnitId,
        /// Final translation after unmasking
        translation: String,
        /// Wall time of the provider round trip, zero on memory hits
        latency_ms: u64,
        /// Whether the translation came from the translation memory
        from_memory: bool,
        /// Estimated time remaining for the whole batch
        eta: Option<Duration>,
    },

    /// One unit failed; it stays queued for the next run
    UnitFailed {
        /// Failed unit
        id: UnitId,
        /// Error message recorded on the unit
        error: String,
    },

    /// A translation still carried source-script characters after the
    /// bounded retry and was accepted anyway
    LeakageAccepted {
        /// Affected unit
        id: UnitId,
    },

    /// Periodic snapshot for crash-safe persistence
    Checkpoint {
        /// Units completed so far in this run
        completed: usize,
        /// Full state snapshot to save
        state: ProjectState,
    },

    /// Batch finished (completed, cancelled, or drained)
    Finished(BatchSummary),
}

/// Final counts for one batch run
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Units queued at the start
    pub total: usize,
    /// Units completed successfully
    pub completed: usize,
    /// Units that failed
    pub failed: usize,
    /// Completions served from the translation memory
    pub from_memory: usize,
    /// Completions accepted with residual source script
    pub leakage_accepted: usize,
    /// Provider calls actually made
    pub provider_calls: usize,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// Rolling completion-rate estimator for time remaining
#[derive(Debug)]
pub struct EtaTracker {
    started: Instant,
    total: usize,
    completed: usize,
}

impl EtaTracker {
    /// Start tracking a batch of `total` units
    pub fn new(total: usize) -> Self {
        Self {
            started: Instant::now(),
            total,
            completed: 0,
        }
    }

    /// Record one completion
    pub fn record(&mut self) {
        self.completed += 1;
    }

    /// Units completed so far
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Wall time since the batch started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Estimated time remaining from the average pace so far.
    /// None until the first completion.
    pub fn eta(&self) -> Option<Duration> {
        if self.completed == 0 || self.total <= self.completed {
            return if self.total <= self.completed {
                Some(Duration::ZERO)
            } else {
                None
            };
        }
        let per_unit = self.started.elapsed() / self.completed as u32;
        let remaining = (self.total - self.completed) as u32;
        Some(per_unit * remaining)
    }
}
