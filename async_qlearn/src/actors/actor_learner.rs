//! Asynchronous one-step Q-learning worker.
//!
//! Each worker owns one environment instance and loops:
//!
//! ```text
//! EPISODE_START ─► ACTING ─► (segment full | terminal) ─► TRAINING ─┐
//!       ▲             ▲                                              │
//!       │             └──────────── not terminal ────────────────────┤
//!       └────────────────────────── terminal ───────────────────────┘
//! ```
//!
//! The budget and the completion flag are checked before every segment, so
//! a worker always finishes the segment it started.
//!
//! A designated worker that fails parks its duties in the run's
//! [`DutyRelay`](crate::actors::DutyRelay); regular workers check the relay
//! after every segment and the first one to look takes them over.

use crate::actors::duties::{CoordinatorDuties, DutyRelay, SharedDutyRelay};
use crate::checkpoint::CheckpointStore;
use crate::core::completion::SharedCompletionFlag;
use crate::core::frame_counter::SharedFrameCounter;
use crate::core::segment::{argmax, clip_reward, max_value, TrajectorySegment};
use crate::environment::{EnvHandle, Environment, StepMode};
use crate::error::{ModelError, TrainError};
use crate::messages::{panic_message, FinishReason, WorkerReport};
use crate::metrics::SharedEpsilonBoard;
use crate::model::{QFunction, SharedModelHandle};
use crate::scheduling::EpsilonSchedule;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Per-worker settings.
#[derive(Debug, Clone)]
pub struct ActorConfig {
    /// Worker ID (for logging and the epsilon board slot)
    pub worker_id: usize,
    /// Discount factor
    pub gamma: f32,
    /// Maximum segment length
    pub tmax: usize,
    /// Global frame budget
    pub total_frames: u64,
    /// Exploration schedule drawn for this worker
    pub schedule: EpsilonSchedule,
    /// Seed of the exploration RNG
    pub seed: u64,
}

impl ActorConfig {
    /// Settings with the reference defaults; the RNG seed is the worker ID.
    pub fn new(worker_id: usize, schedule: EpsilonSchedule) -> Self {
        Self {
            worker_id,
            gamma: 0.99,
            tmax: 5,
            total_frames: 40_000_000,
            schedule,
            seed: worker_id as u64,
        }
    }

    /// Set the discount factor.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the maximum segment length.
    pub fn with_tmax(mut self, tmax: usize) -> Self {
        self.tmax = tmax;
        self
    }

    /// Set the global frame budget.
    pub fn with_total_frames(mut self, total_frames: u64) -> Self {
        self.total_frames = total_frames;
        self
    }

    /// Set the exploration RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Whether a worker carries the coordinator duties.
pub enum Role<S> {
    Designated(Box<CoordinatorDuties<S>>),
    Regular,
}

impl<S> Role<S> {
    pub fn is_designated(&self) -> bool {
        matches!(self, Role::Designated(_))
    }
}

/// Run-wide state every worker is handed at construction.
pub struct SharedState<Q> {
    pub model: SharedModelHandle<Q>,
    pub frames: SharedFrameCounter,
    pub done: SharedCompletionFlag,
    pub board: SharedEpsilonBoard,
}

impl<Q> Clone for SharedState<Q> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            frames: self.frames.clone(),
            done: self.done.clone(),
            board: self.board.clone(),
        }
    }
}

/// One actor-learner thread body.
pub struct ActorLearner<E, Q, S> {
    config: ActorConfig,
    env: EnvHandle<E>,
    shared: SharedState<Q>,
    role: Role<S>,
    relay: SharedDutyRelay<S>,
    rng: StdRng,
    report: WorkerReport,
}

impl<E, Q, S> ActorLearner<E, Q, S>
where
    E: Environment,
    Q: QFunction,
    S: CheckpointStore,
{
    pub fn new(
        config: ActorConfig,
        env: EnvHandle<E>,
        shared: SharedState<Q>,
        role: Role<S>,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let report = WorkerReport::new(
            config.worker_id,
            config.schedule.eps_min(),
            FinishReason::Completed,
        );
        Self {
            config,
            env,
            shared,
            role,
            relay: Arc::new(DutyRelay::new()),
            rng,
            report,
        }
    }

    /// Share the run-wide duty relay instead of a private one.
    pub fn with_relay(mut self, relay: SharedDutyRelay<S>) -> Self {
        self.relay = relay;
        self
    }

    pub fn worker_id(&self) -> usize {
        self.config.worker_id
    }

    pub fn role(&self) -> &Role<S> {
        &self.role
    }

    /// Run until the budget is reached, the run is stopped, or a fault.
    pub fn run(mut self) -> WorkerReport {
        let id = self.config.worker_id;
        log::info!(
            "Worker {} starting (eps_min {}, designated: {})",
            id,
            self.config.schedule.eps_min(),
            self.role.is_designated()
        );
        self.shared
            .board
            .publish(id, self.config.schedule.value(self.shared.frames.read()));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.train()));
        let reason = match outcome {
            Ok(Ok(reason)) => reason,
            Ok(Err(TrainError::Env(e))) => {
                log::error!("Worker {} environment failed: {}", id, e);
                FinishReason::EnvironmentFailed(e.to_string())
            }
            Ok(Err(e)) => {
                log::error!("Worker {} model failed: {}", id, e);
                FinishReason::ModelFailed(e.to_string())
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::error!("Worker {} panicked: {}", id, msg);
                FinishReason::Panicked(msg)
            }
        };

        if let Role::Designated(mut duties) = std::mem::replace(&mut self.role, Role::Regular) {
            if reason.is_failure() && !self.shared.done.is_set() {
                log::warn!("Worker {} releasing the coordinator duties", id);
                self.relay.release(duties);
            } else {
                duties.finish();
            }
        }

        self.report.reason = reason;
        log::info!(
            "Worker {} finished after {} steps, {} episodes, {} updates: {:?}",
            id,
            self.report.steps,
            self.report.episodes,
            self.report.train_steps,
            self.report.reason
        );
        self.report
    }

    fn train(&mut self) -> Result<FinishReason, TrainError> {
        let mut segment = TrajectorySegment::with_capacity(self.config.tmax);
        let mut state: Option<Vec<f32>> = None;

        loop {
            if self.shared.done.is_set() {
                return Ok(FinishReason::Stopped);
            }
            if self.shared.frames.read() >= self.config.total_frames {
                if self.shared.done.set() {
                    log::info!(
                        "Worker {} reached the frame budget of {}",
                        self.config.worker_id,
                        self.config.total_frames
                    );
                }
                return Ok(FinishReason::Completed);
            }

            let mut current = match state.take() {
                Some(s) => s,
                None => {
                    self.report.episodes += 1;
                    self.env.lock().reset()?
                }
            };
            segment.clear();

            while !segment.is_full() {
                let frame = self.shared.frames.increment();
                let epsilon = self.config.schedule.value(frame);
                let action = self.choose_action(&current, epsilon)?;

                let outcome = self.env.lock().step(action, StepMode::Train)?;
                self.report.steps += 1;

                let reward = clip_reward(outcome.reward);
                let ret = if outcome.terminal {
                    reward
                } else {
                    let next_q = self.shared.model.predict_target(&outcome.state)?;
                    reward + self.config.gamma * max_value(&next_q)
                };

                let prev = std::mem::replace(&mut current, outcome.state);
                segment.push(prev, action, ret);
                if outcome.terminal {
                    segment.mark_terminal();
                    break;
                }
            }

            self.submit(&segment);

            let frame = self.shared.frames.read();
            if !self.role.is_designated() {
                if let Some(duties) = self.relay.claim() {
                    log::warn!(
                        "Worker {} took over the coordinator duties at frame {}",
                        self.config.worker_id,
                        frame
                    );
                    self.role = Role::Designated(duties);
                    self.report.took_over_duties = true;
                }
            }
            self.shared
                .board
                .publish(self.config.worker_id, self.config.schedule.value(frame));

            if let Role::Designated(duties) = &mut self.role {
                duties.after_update(&self.shared.model, frame);
                if segment.is_terminal() {
                    let mut env = self.env.lock();
                    duties.at_episode_boundary(&mut *env, &self.shared.model, frame)?;
                }
            }

            state = if segment.is_terminal() { None } else { Some(current) };
        }
    }

    fn choose_action(&mut self, state: &[f32], epsilon: f64) -> Result<usize, ModelError> {
        if self.rng.gen::<f64>() < epsilon {
            return Ok(self.rng.gen_range(0..self.shared.model.n_actions()));
        }
        let q = self.shared.model.predict(state)?;
        Ok(argmax(&q).unwrap_or(0))
    }

    fn submit(&mut self, segment: &TrajectorySegment) {
        debug_assert!(segment.ready());
        match self.shared.model.train_step(segment.as_batch()) {
            Ok(()) => {
                self.report.train_steps += 1;
                log::debug!(
                    "Worker {} trained on {} steps (terminal: {})",
                    self.config.worker_id,
                    segment.len(),
                    segment.is_terminal()
                );
            }
            Err(e) => {
                self.report.failed_train_steps += 1;
                log::warn!(
                    "Worker {} training step failed, segment discarded: {}",
                    self.config.worker_id,
                    e
                );
            }
        }
    }
}
