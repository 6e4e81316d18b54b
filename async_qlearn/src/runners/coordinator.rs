//! Run lifecycle: restore, spawn, supervise, join.
//!
//! ```text
//! Coordinator::run
//!   ├─ validate config, build N environments
//!   ├─ restore latest checkpoint (fatal unless allow_cold_start) ─► sync target
//!   ├─ draw one epsilon floor per worker
//!   ├─ spawn N actor-learner threads (worker 0 carries the duties; a
//!   │  survivor takes them over if worker 0 fails)
//!   ├─ poll: render, collect WorkerFinished reports
//!   └─ join all threads ─► TrainingSummary
//! ```
//!
//! The coordinator never trains. It only reads the frame counter and the
//! completion flag, and sets the flag when a failure must stop the run.

use crate::actors::{ActorConfig, ActorLearner, CoordinatorDuties, DutyRelay, Role, SharedState};
use crate::checkpoint::{CheckpointStore, Checkpointer, CheckpointerConfig, FileCheckpointStore};
use crate::core::completion::completion_flag;
use crate::core::frame_counter::frame_counter;
use crate::core::target_sync::TargetSynchronizer;
use crate::environment::{env_handle, EnvHandle, Environment};
use crate::error::{CheckpointError, ConfigError, EnvError, ModelError, TrainError};
use crate::evaluation::{EvalResult, Evaluator};
use crate::messages::{panic_message, CoordinatorMsg, FinishReason, WorkerReport};
use crate::metrics::{epsilon_board, ConsoleSink, MetricsRecord, MetricsSink};
use crate::model::{QFunction, SharedModel, SharedModelHandle};
use crate::runners::config::TrainerConfig;
use crate::scheduling::EpsilonSampler;
use crossbeam_channel::RecvTimeoutError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Outcome of a finished training run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    /// Frame count restored from the checkpoint (0 on a cold start).
    pub start_frame: u64,
    /// Frame count when the last worker stopped.
    pub final_frames: u64,
    /// Accepted training submissions over all workers.
    pub train_steps: u64,
    /// Rejected training submissions over all workers.
    pub failed_train_steps: u64,
    pub target_syncs: u64,
    /// One report per worker, ordered by worker id.
    pub workers: Vec<WorkerReport>,
    pub elapsed: Duration,
}

impl TrainingSummary {
    /// Frames produced by this run.
    pub fn frames_this_run(&self) -> u64 {
        self.final_frames.saturating_sub(self.start_frame)
    }

    pub fn failed_workers(&self) -> impl Iterator<Item = &WorkerReport> {
        self.workers.iter().filter(|w| w.reason.is_failure())
    }
}

/// Spawns and supervises the actor-learners of one run.
pub struct Coordinator<S = FileCheckpointStore> {
    config: TrainerConfig,
    store: S,
    sink: Box<dyn MetricsSink>,
}

impl Coordinator<FileCheckpointStore> {
    /// Coordinator persisting checkpoints under `config.checkpoint_dir`.
    pub fn new(config: TrainerConfig) -> Result<Self, TrainError> {
        let store = FileCheckpointStore::open(&config.checkpoint_dir)?;
        Self::with_store(config, store)
    }
}

impl<S: CheckpointStore + 'static> Coordinator<S> {
    pub fn with_store(config: TrainerConfig, store: S) -> Result<Self, TrainError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            sink: Box::new(ConsoleSink),
        })
    }

    /// Replace the default metrics sink (the `log` facade).
    pub fn with_sink(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train `model` with one environment per worker built by `make_env`.
    ///
    /// Blocks until every worker has stopped. The caller keeps its handle
    /// on `model` to use the trained weights afterwards.
    pub fn run<Q, E, F>(
        self,
        model: SharedModelHandle<Q>,
        mut make_env: F,
    ) -> Result<TrainingSummary, TrainError>
    where
        Q: QFunction + 'static,
        E: Environment + 'static,
        F: FnMut(usize) -> Result<E, EnvError>,
    {
        let started = Instant::now();
        let Self { config, store, sink } = self;

        let envs: Vec<EnvHandle<E>> = (0..config.threads)
            .map(|id| make_env(id).map(env_handle))
            .collect::<Result<_, _>>()?;
        check_action_space(&model, envs[0].lock().n_actions())?;

        let mut checkpointer = Checkpointer::new(
            store,
            CheckpointerConfig::new(config.log_interval).with_keep_last_n(config.keep_checkpoints),
        )?;
        let start_frame = restore(&mut checkpointer, &model, config.allow_cold_start)?;

        let frames = frame_counter(start_frame);
        let done = completion_flag();
        let board = epsilon_board(config.threads, config.eps_start);
        let shared = SharedState {
            model: model.clone(),
            frames: frames.clone(),
            done: done.clone(),
            board: board.clone(),
        };

        let mut duties = Some(Box::new(CoordinatorDuties::new(
            TargetSynchronizer::new(config.update_interval, start_frame),
            checkpointer,
            Evaluator::new(config.test_iter, config.eval_max_steps),
            sink,
            board,
            config.log_interval,
            start_frame,
        )));

        let relay = Arc::new(DutyRelay::new());
        let mut sampler = EpsilonSampler::new(&config.eps_min_candidates, config.seed)?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut handles: Vec<JoinHandle<WorkerReport>> = Vec::with_capacity(config.threads);

        log::info!(
            "Starting {} workers at frame {} (budget {})",
            config.threads,
            start_frame,
            config.total_frames
        );

        for (id, env) in envs.iter().enumerate() {
            let schedule = sampler.schedule(config.eps_start, config.eps_steps);
            let actor_config = ActorConfig::new(id, schedule)
                .with_gamma(config.gamma)
                .with_tmax(config.tmax)
                .with_total_frames(config.total_frames)
                .with_seed(config.seed.wrapping_add(id as u64 + 1));
            let role = match duties.take() {
                Some(d) => Role::Designated(d),
                None => Role::Regular,
            };
            let worker = ActorLearner::new(actor_config, env.clone(), shared.clone(), role)
                .with_relay(relay.clone());
            let tx = tx.clone();
            let eps_min = schedule.eps_min();

            let spawned = thread::Builder::new()
                .name(format!("actor-learner-{}", id))
                .spawn(move || {
                    let report = panic::catch_unwind(AssertUnwindSafe(move || worker.run()))
                        .unwrap_or_else(|payload| {
                            let msg = panic_message(payload.as_ref());
                            log::error!("Worker {} panicked: {}", id, msg);
                            WorkerReport::new(id, eps_min, FinishReason::Panicked(msg))
                        });
                    let _ = tx.send(CoordinatorMsg::worker_finished(report.clone()));
                    report
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    done.set();
                    join_all(handles);
                    return Err(TrainError::WorkerSpawn { worker_id: id, source });
                }
            }
        }
        drop(tx);

        let poll = Duration::from_millis(config.render_poll_ms.max(1));
        let mut finished = 0usize;
        let mut abort: Option<TrainError> = None;
        let mut budget_logged = false;

        while finished < config.threads {
            match rx.recv_timeout(poll) {
                Ok(CoordinatorMsg::WorkerFinished(report)) => {
                    finished += 1;
                    if let Some(reason) = report.reason.failure_reason() {
                        log::warn!("Worker {} stopped early: {}", report.worker_id, reason);
                        if config.abort_on_worker_failure && abort.is_none() {
                            done.set();
                            abort = Some(TrainError::WorkerFailed {
                                worker_id: report.worker_id,
                                reason: reason.to_string(),
                            });
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if done.is_set() && !budget_logged {
                log::info!("Completion flag set at frame {}; waiting for workers", frames.read());
                budget_logged = true;
            }
            if config.render && !done.is_set() {
                for env in &envs {
                    env.lock().render();
                }
            }
        }

        let workers = join_all(handles);
        if let Some(mut duties) = relay.claim() {
            // No worker was left to take them over.
            duties.finish();
        }
        if let Some(err) = abort {
            return Err(err);
        }
        if !done.is_set() {
            // Every worker stopped without reaching the budget.
            let failed = workers.iter().find_map(|w| {
                w.reason
                    .failure_reason()
                    .map(|r| (w.worker_id, r.to_string()))
            });
            if let Some((worker_id, reason)) = failed {
                return Err(TrainError::WorkerFailed { worker_id, reason });
            }
        }

        let summary = TrainingSummary {
            start_frame,
            final_frames: frames.read(),
            train_steps: model.train_steps(),
            failed_train_steps: model.failed_train_steps(),
            target_syncs: model.target_syncs(),
            workers,
            elapsed: started.elapsed(),
        };
        log::info!(
            "Training finished at frame {} after {:.1}s ({} updates)",
            summary.final_frames,
            summary.elapsed.as_secs_f64(),
            summary.train_steps
        );
        Ok(summary)
    }
}

/// Evaluation-only run: restore the latest checkpoint, then play
/// `eval_iter` greedy episodes.
pub fn evaluate_checkpoint<Q, E, S>(
    config: &TrainerConfig,
    model: &SharedModel<Q>,
    env: &mut E,
    store: &S,
) -> Result<EvalResult, TrainError>
where
    Q: QFunction,
    E: Environment + ?Sized,
    S: CheckpointStore + ?Sized,
{
    config.validate()?;
    check_action_space(model, env.n_actions())?;

    let info = store.latest()?.ok_or(CheckpointError::NoCheckpoints)?;
    let checkpoint = store.load(&info)?;
    model.restore(&checkpoint.blob)?;
    model.sync_target()?;

    let result = Evaluator::new(config.eval_iter, config.eval_max_steps).run_test_episodes(
        env,
        model,
        config.eval_iter,
    )?;
    let record = MetricsRecord {
        frame: checkpoint.frame(),
        avg_reward: result.mean_reward(),
        avg_max_q: result.mean_max_q(),
        avg_epsilon: 0.0,
    };
    log::info!("{}", record.summary_line());
    Ok(result)
}

fn check_action_space<Q: QFunction>(
    model: &SharedModel<Q>,
    env_actions: usize,
) -> Result<(), TrainError> {
    if env_actions == 0 {
        return Err(ConfigError::InvalidCount {
            field: "n_actions",
            value: 0,
        }
        .into());
    }
    if model.n_actions() != env_actions {
        return Err(ModelError::Shape {
            expected: env_actions,
            actual: model.n_actions(),
        }
        .into());
    }
    Ok(())
}

fn restore<Q: QFunction, S: CheckpointStore>(
    checkpointer: &mut Checkpointer<S>,
    model: &SharedModel<Q>,
    allow_cold_start: bool,
) -> Result<u64, TrainError> {
    match checkpointer.restore_latest(model) {
        Ok(Some(frame)) => {
            model.sync_target()?;
            log::info!("Restored checkpoint at frame {}", frame);
            Ok(frame)
        }
        Ok(None) => {
            log::info!("No checkpoint found, starting from frame 0");
            Ok(0)
        }
        Err(e) if allow_cold_start => {
            log::warn!("Checkpoint restore failed, cold-starting: {}", e);
            checkpointer.set_last_save_frame(0);
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

fn join_all(handles: Vec<JoinHandle<WorkerReport>>) -> Vec<WorkerReport> {
    let mut reports: Vec<WorkerReport> = handles
        .into_iter()
        .enumerate()
        .map(|(id, handle)| {
            handle.join().unwrap_or_else(|payload| {
                let reason = FinishReason::Panicked(panic_message(payload.as_ref()));
                WorkerReport::new(id, f64::NAN, reason)
            })
        })
        .collect();
    reports.sort_by_key(|r| r.worker_id);
    reports
}
