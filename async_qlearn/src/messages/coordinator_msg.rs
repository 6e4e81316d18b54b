//! Messages sent to the Coordinator.

use std::any::Any;

/// Messages sent to the coordinator from workers.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorMsg {
    /// Worker loop returned, normally or after a fatal fault.
    WorkerFinished(WorkerReport),
}

impl CoordinatorMsg {
    pub fn worker_finished(report: WorkerReport) -> Self {
        Self::WorkerFinished(report)
    }
}

/// Reason why a worker finished.
#[derive(Debug, Clone, PartialEq)]
pub enum FinishReason {
    /// This worker observed the frame budget reached.
    Completed,

    /// Another party set the completion flag first.
    Stopped,

    /// Environment `reset`/`step` failed.
    EnvironmentFailed(String),

    /// `predict`/`predict_target` failed.
    ModelFailed(String),

    /// Worker thread panicked.
    Panicked(String),
}

impl FinishReason {
    /// Whether the worker stopped because of a fault.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::EnvironmentFailed(_) | Self::ModelFailed(_) | Self::Panicked(_)
        )
    }

    /// Human-readable cause for failures.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::EnvironmentFailed(r) | Self::ModelFailed(r) | Self::Panicked(r) => Some(r),
            Self::Completed | Self::Stopped => None,
        }
    }
}

/// What one worker did during the run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Environment steps this worker took (its share of the frame counter).
    pub steps: u64,
    /// Episodes started.
    pub episodes: u64,
    /// Accepted training submissions.
    pub train_steps: u64,
    /// Training submissions the approximator rejected.
    pub failed_train_steps: u64,
    /// Epsilon floor drawn for this worker.
    pub eps_min: f64,
    /// Took over the coordinator duties from a failed worker.
    pub took_over_duties: bool,
    pub reason: FinishReason,
}

impl WorkerReport {
    /// Empty report for a worker that never ran its loop.
    pub fn new(worker_id: usize, eps_min: f64, reason: FinishReason) -> Self {
        Self {
            worker_id,
            steps: 0,
            episodes: 0,
            train_steps: 0,
            failed_train_steps: 0,
            eps_min,
            took_over_duties: false,
            reason,
        }
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
