//! Value-function approximator interface and the shared model handle.
//!
//! The approximator itself (architecture, optimizer, numerics) is a plug-in
//! behind [`QFunction`]. [`SharedModel`] is what the workers actually hold:
//! it owns the single write lock that serializes `train_step` for
//! approximators that are not safe under concurrent training, and keeps
//! run-wide update counters.
//!
//! # Concurrency contract
//!
//! ```text
//! predict / predict_target   any worker, concurrently, never blocked by the lock
//! train_step                 any worker; serialized unless CONCURRENT_TRAIN
//! sync_target                designated worker only; holds the write lock
//! serialize / restore        holds the write lock (consistent snapshot)
//! ```
//!
//! Reads racing a write may see weights a few updates old. Asynchronous
//! Q-learning tolerates that staleness.

pub mod linear;

pub use linear::{LinearQ, LinearWeights};

use crate::core::segment::TrainBatch;
use crate::error::ModelError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Capability interface of a Q-value approximator with a target copy.
///
/// All methods take `&self`; implementations keep their weights behind
/// interior mutability and must give readers a consistent snapshot (never a
/// half-written weight set).
pub trait QFunction: Send + Sync {
    /// Whether `train_step` may be invoked from several threads at once.
    ///
    /// When `false`, [`SharedModel`] serializes all training calls.
    const CONCURRENT_TRAIN: bool = false;

    /// Size of the discrete action space.
    fn n_actions(&self) -> usize;

    /// Q-values of the live weights, one per action.
    fn predict(&self, state: &[f32]) -> Result<Vec<f32>, ModelError>;

    /// Q-values of the frozen target weights, one per action.
    fn predict_target(&self, state: &[f32]) -> Result<Vec<f32>, ModelError>;

    /// Apply one gradient update regressing `Q(s, a)` towards the returns.
    fn train_step(&self, batch: TrainBatch<'_>) -> Result<(), ModelError>;

    /// Copy live weights into the target weights.
    fn sync_target(&self) -> Result<(), ModelError>;

    /// Encode live and target weights.
    fn serialize(&self) -> Result<Vec<u8>, ModelError>;

    /// Replace live and target weights with a previously serialized blob.
    fn restore(&self, blob: &[u8]) -> Result<(), ModelError>;
}

/// Run-wide handle to the one approximator all workers share.
pub struct SharedModel<Q> {
    inner: Q,
    write_lock: Mutex<()>,
    train_steps: AtomicU64,
    failed_train_steps: AtomicU64,
    target_syncs: AtomicU64,
}

impl<Q: QFunction> SharedModel<Q> {
    pub fn new(inner: Q) -> Self {
        Self {
            inner,
            write_lock: Mutex::new(()),
            train_steps: AtomicU64::new(0),
            failed_train_steps: AtomicU64::new(0),
            target_syncs: AtomicU64::new(0),
        }
    }

    /// The wrapped approximator.
    pub fn inner(&self) -> &Q {
        &self.inner
    }

    pub fn n_actions(&self) -> usize {
        self.inner.n_actions()
    }

    pub fn predict(&self, state: &[f32]) -> Result<Vec<f32>, ModelError> {
        self.inner.predict(state)
    }

    pub fn predict_target(&self, state: &[f32]) -> Result<Vec<f32>, ModelError> {
        self.inner.predict_target(state)
    }

    /// Submit one segment for a gradient update.
    ///
    /// This is the only path through which workers mutate live weights.
    pub fn train_step(&self, batch: TrainBatch<'_>) -> Result<(), ModelError> {
        if !batch.is_consistent() {
            self.failed_train_steps.fetch_add(1, Ordering::Relaxed);
            return Err(ModelError::MalformedBatch {
                states: batch.states.len(),
                actions: batch.actions.len(),
                returns: batch.returns.len(),
            });
        }

        let result = if Q::CONCURRENT_TRAIN {
            self.inner.train_step(batch)
        } else {
            let _guard = self.write_lock.lock();
            self.inner.train_step(batch)
        };

        match &result {
            Ok(()) => self.train_steps.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed_train_steps.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    /// Copy live weights into the target.
    pub fn sync_target(&self) -> Result<(), ModelError> {
        let _guard = self.write_lock.lock();
        self.inner.sync_target()?;
        self.target_syncs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Snapshot both weight sets between updates.
    pub fn serialize(&self) -> Result<Vec<u8>, ModelError> {
        let _guard = self.write_lock.lock();
        self.inner.serialize()
    }

    pub fn restore(&self, blob: &[u8]) -> Result<(), ModelError> {
        let _guard = self.write_lock.lock();
        self.inner.restore(blob)
    }

    /// Successful training submissions so far.
    pub fn train_steps(&self) -> u64 {
        self.train_steps.load(Ordering::Relaxed)
    }

    /// Training submissions rejected by the approximator.
    pub fn failed_train_steps(&self) -> u64 {
        self.failed_train_steps.load(Ordering::Relaxed)
    }

    pub fn target_syncs(&self) -> u64 {
        self.target_syncs.load(Ordering::Relaxed)
    }
}

/// Shared model handle.
pub type SharedModelHandle<Q> = Arc<SharedModel<Q>>;

/// Wrap an approximator into a shared handle.
pub fn shared_model<Q: QFunction>(inner: Q) -> SharedModelHandle<Q> {
    Arc::new(SharedModel::new(inner))
}
