//! Extra work done by the one designated worker.
//!
//! Exactly one [`CoordinatorDuties`] exists per run and it is moved into the
//! designated worker at startup. Target sync, checkpointing, evaluation and
//! metrics emission therefore all have a single writer.
//!
//! If the designated worker fails, it parks the duties in the run's
//! [`DutyRelay`] and the next surviving worker to finish a segment claims
//! them. The cadences carry over, so a late trigger still fires.

use crate::checkpoint::{CheckpointStore, Checkpointer};
use crate::core::target_sync::{sync_due, TargetSynchronizer};
use crate::environment::Environment;
use crate::error::TrainError;
use crate::evaluation::Evaluator;
use crate::metrics::{MetricsRecord, MetricsSink, SharedEpsilonBoard};
use crate::model::{QFunction, SharedModel};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Target sync, checkpoint, evaluation and metrics cadences.
pub struct CoordinatorDuties<S> {
    synchronizer: TargetSynchronizer,
    checkpointer: Checkpointer<S>,
    evaluator: Evaluator,
    sink: Box<dyn MetricsSink>,
    board: SharedEpsilonBoard,
    log_interval: u64,
    last_log_frame: u64,
    failed_saves: u64,
}

impl<S: CheckpointStore> CoordinatorDuties<S> {
    /// The evaluation cadence starts counting at `start_frame`.
    pub fn new(
        synchronizer: TargetSynchronizer,
        checkpointer: Checkpointer<S>,
        evaluator: Evaluator,
        sink: Box<dyn MetricsSink>,
        board: SharedEpsilonBoard,
        log_interval: u64,
        start_frame: u64,
    ) -> Self {
        Self {
            synchronizer,
            checkpointer,
            evaluator,
            sink,
            board,
            log_interval,
            last_log_frame: start_frame,
            failed_saves: 0,
        }
    }

    pub fn synchronizer(&self) -> &TargetSynchronizer {
        &self.synchronizer
    }

    pub fn checkpointer(&self) -> &Checkpointer<S> {
        &self.checkpointer
    }

    /// Save attempts that failed and were deferred.
    pub fn failed_saves(&self) -> u64 {
        self.failed_saves
    }

    /// Run after every training submission.
    ///
    /// A failed sync is logged and retried on the next call.
    pub fn after_update<Q: QFunction>(&mut self, model: &SharedModel<Q>, frame: u64) {
        match self.synchronizer.maybe_sync(model, frame) {
            Ok(true) => log::info!("Synced target network at frame {}", frame),
            Ok(false) => {}
            Err(e) => log::warn!("Target sync at frame {} failed: {}", frame, e),
        }
    }

    /// Run when the designated worker's episode just ended.
    ///
    /// Saves a checkpoint if due, then evaluates and emits a metrics record
    /// if the logging cadence is due. Save failures are logged and retried
    /// at the next boundary. Evaluation faults are returned: they come from
    /// the worker's own environment or the model and end the worker.
    pub fn at_episode_boundary<E, Q>(
        &mut self,
        env: &mut E,
        model: &SharedModel<Q>,
        frame: u64,
    ) -> Result<Option<MetricsRecord>, TrainError>
    where
        E: Environment + ?Sized,
        Q: QFunction,
    {
        if let Err(e) = self.checkpointer.maybe_save(model, frame, true) {
            self.failed_saves += 1;
            log::warn!(
                "Checkpoint save at frame {} failed: {}; retrying at the next episode boundary",
                frame,
                e
            );
        }

        if !sync_due(frame, self.last_log_frame, self.log_interval) {
            return Ok(None);
        }

        let result = self.evaluator.run(env, model)?;
        self.last_log_frame = frame;

        let record = MetricsRecord {
            frame,
            avg_reward: result.mean_reward(),
            avg_max_q: result.mean_max_q(),
            avg_epsilon: self.board.mean(),
        };
        self.sink.append(&record);
        self.sink.flush();
        Ok(Some(record))
    }

    /// Flush the metrics sink at worker exit.
    pub fn finish(&mut self) {
        self.sink.flush();
    }
}

/// Hand-off point for the duties of a worker that stopped early.
pub struct DutyRelay<S> {
    pending: AtomicBool,
    slot: Mutex<Option<Box<CoordinatorDuties<S>>>>,
}

impl<S> DutyRelay<S> {
    pub fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            slot: Mutex::new(None),
        }
    }

    /// Park the duties until a worker claims them.
    pub fn release(&self, duties: Box<CoordinatorDuties<S>>) {
        *self.slot.lock() = Some(duties);
        self.pending.store(true, Ordering::Release);
    }

    /// Take the parked duties, if any. At most one caller gets them.
    pub fn claim(&self) -> Option<Box<CoordinatorDuties<S>>> {
        if !self.pending.load(Ordering::Acquire) {
            return None;
        }
        let duties = self.slot.lock().take();
        if duties.is_some() {
            self.pending.store(false, Ordering::Release);
        }
        duties
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl<S> Default for DutyRelay<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Relay shared by all workers of a run.
pub type SharedDutyRelay<S> = Arc<DutyRelay<S>>;
