//! Stub collaborators shared by the unit and scenario tests.

use crate::core::segment::TrainBatch;
use crate::environment::{Environment, StepMode, StepOutcome};
use crate::error::{EnvError, ModelError};
use crate::model::QFunction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Approximator that always answers the same Q-values.
///
/// Counts calls and tracks how many `train_step`s overlapped in time.
pub struct FixedQ {
    values: Mutex<Vec<f32>>,
    target: Mutex<Vec<f32>>,
    fail_train: AtomicBool,
    fail_predict: bool,
    train_calls: AtomicUsize,
    sync_calls: AtomicUsize,
    active_trains: AtomicUsize,
    max_active_trains: AtomicUsize,
    batch_lens: Mutex<Vec<usize>>,
    batch_returns: Mutex<Vec<Vec<f32>>>,
}

impl FixedQ {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            target: Mutex::new(values.clone()),
            values: Mutex::new(values),
            fail_train: AtomicBool::new(false),
            fail_predict: false,
            train_calls: AtomicUsize::new(0),
            sync_calls: AtomicUsize::new(0),
            active_trains: AtomicUsize::new(0),
            max_active_trains: AtomicUsize::new(0),
            batch_lens: Mutex::new(Vec::new()),
            batch_returns: Mutex::new(Vec::new()),
        }
    }

    /// Give the target network its own values until the next sync.
    pub fn with_target(self, target: Vec<f32>) -> Self {
        *self.target.lock() = target;
        self
    }

    /// Every `train_step` reports divergence.
    pub fn failing_train(self) -> Self {
        self.fail_train.store(true, Ordering::Relaxed);
        self
    }

    /// Every `predict`/`predict_target` fails.
    pub fn failing_predict(mut self) -> Self {
        self.fail_predict = true;
        self
    }

    /// Change the live values; the target keeps its values until synced.
    pub fn set_values(&self, values: Vec<f32>) {
        *self.values.lock() = values;
    }

    pub fn train_calls(&self) -> usize {
        self.train_calls.load(Ordering::SeqCst)
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_trains(&self) -> usize {
        self.max_active_trains.load(Ordering::SeqCst)
    }

    /// Lengths of every batch received, in arrival order.
    pub fn batch_lens(&self) -> Vec<usize> {
        self.batch_lens.lock().clone()
    }

    /// Returns column of every batch received, in arrival order.
    pub fn batch_returns(&self) -> Vec<Vec<f32>> {
        self.batch_returns.lock().clone()
    }
}

impl QFunction for FixedQ {
    fn n_actions(&self) -> usize {
        self.values.lock().len()
    }

    fn predict(&self, _state: &[f32]) -> Result<Vec<f32>, ModelError> {
        if self.fail_predict {
            return Err(ModelError::Inference("stub failure".into()));
        }
        Ok(self.values.lock().clone())
    }

    fn predict_target(&self, _state: &[f32]) -> Result<Vec<f32>, ModelError> {
        if self.fail_predict {
            return Err(ModelError::Inference("stub failure".into()));
        }
        Ok(self.target.lock().clone())
    }

    fn train_step(&self, batch: TrainBatch<'_>) -> Result<(), ModelError> {
        let active = self.active_trains.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_trains.fetch_max(active, Ordering::SeqCst);
        std::thread::yield_now();
        self.train_calls.fetch_add(1, Ordering::SeqCst);
        self.batch_lens.lock().push(batch.len());
        self.batch_returns.lock().push(batch.returns.to_vec());
        self.active_trains.fetch_sub(1, Ordering::SeqCst);

        if self.fail_train.load(Ordering::Relaxed) {
            Err(ModelError::Diverged("stub divergence".into()))
        } else {
            Ok(())
        }
    }

    fn sync_target(&self) -> Result<(), ModelError> {
        *self.target.lock() = self.values.lock().clone();
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(&*self.values.lock())
            .map_err(|e| ModelError::Serialization(e.to_string()))
    }

    fn restore(&self, blob: &[u8]) -> Result<(), ModelError> {
        let values: Vec<f32> =
            serde_json::from_slice(blob).map_err(|e| ModelError::Serialization(e.to_string()))?;
        *self.target.lock() = values.clone();
        *self.values.lock() = values;
        Ok(())
    }
}

/// Deterministic environment whose episodes end exactly at step `episode_len`.
///
/// The observation is `[step_in_episode]`; every step pays `reward`.
pub struct CountdownEnv {
    n_actions: usize,
    episode_len: usize,
    reward: f32,
    t: usize,
    fail_after: Option<usize>,
    total_steps: usize,
    test_steps: usize,
    resets: usize,
}

impl CountdownEnv {
    pub fn new(episode_len: usize, n_actions: usize) -> Self {
        Self {
            n_actions,
            episode_len,
            reward: 0.0,
            t: 0,
            fail_after: None,
            total_steps: 0,
            test_steps: 0,
            resets: 0,
        }
    }

    pub fn with_reward(mut self, reward: f32) -> Self {
        self.reward = reward;
        self
    }

    /// Fail every step once `steps` steps have been taken in total.
    pub fn failing_after(mut self, steps: usize) -> Self {
        self.fail_after = Some(steps);
        self
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn test_steps(&self) -> usize {
        self.test_steps
    }

    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl Environment for CountdownEnv {
    fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        self.t = 0;
        self.resets += 1;
        Ok(vec![0.0])
    }

    fn step(&mut self, action: usize, mode: StepMode) -> Result<StepOutcome, EnvError> {
        if action >= self.n_actions {
            return Err(EnvError::InvalidAction {
                action,
                n_actions: self.n_actions,
            });
        }
        if self.fail_after.is_some_and(|n| self.total_steps >= n) {
            return Err(EnvError::Step {
                action,
                reason: "injected failure".into(),
            });
        }
        self.t += 1;
        self.total_steps += 1;
        if mode == StepMode::Test {
            self.test_steps += 1;
        }
        Ok(StepOutcome::new(
            vec![self.t as f32],
            self.reward,
            self.t >= self.episode_len,
        ))
    }
}
