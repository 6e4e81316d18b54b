//! Linear Q-function with copy-on-write weight snapshots.
//!
//! `Q(s, a) = w_a · s + b_a`, trained by plain SGD on the squared error
//! between `Q(s, a)` and the segment returns. Live and target weights each
//! sit behind an `RwLock<Arc<_>>`: readers clone the `Arc` and compute on an
//! immutable snapshot, a training step builds a new weight set and swaps it
//! in, so a reader never sees a partially applied update.

use super::QFunction;
use crate::core::segment::TrainBatch;
use crate::error::ModelError;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Dense weights of a linear Q-function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    pub n_features: usize,
    pub n_actions: usize,
    /// Row-major `[n_actions, n_features]`.
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl LinearWeights {
    /// All-zero weights.
    pub fn zeros(n_features: usize, n_actions: usize) -> Self {
        Self {
            n_features,
            n_actions,
            weights: vec![0.0; n_features * n_actions],
            bias: vec![0.0; n_actions],
        }
    }

    /// Small uniform random weights in `[-scale, scale]`.
    pub fn random(n_features: usize, n_actions: usize, scale: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut draw = |n: usize| -> Vec<f32> {
            (0..n).map(|_| rng.gen_range(-scale..=scale)).collect()
        };
        let weights = draw(n_features * n_actions);
        let bias = draw(n_actions);
        Self {
            n_features,
            n_actions,
            weights,
            bias,
        }
    }

    /// Q-values for every action.
    pub fn q_values(&self, state: &[f32]) -> Result<Vec<f32>, ModelError> {
        if state.len() != self.n_features {
            return Err(ModelError::Shape {
                expected: self.n_features,
                actual: state.len(),
            });
        }
        Ok((0..self.n_actions)
            .map(|a| {
                let row = &self.weights[a * self.n_features..(a + 1) * self.n_features];
                row.iter().zip(state).map(|(w, x)| w * x).sum::<f32>() + self.bias[a]
            })
            .collect())
    }

    fn is_finite(&self) -> bool {
        self.weights.iter().chain(&self.bias).all(|v| v.is_finite())
    }

    fn check_dims(&self) -> Result<(), ModelError> {
        let expected = self.n_features * self.n_actions;
        if self.weights.len() != expected {
            return Err(ModelError::Shape {
                expected,
                actual: self.weights.len(),
            });
        }
        if self.bias.len() != self.n_actions {
            return Err(ModelError::Shape {
                expected: self.n_actions,
                actual: self.bias.len(),
            });
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct LinearRecord {
    live: LinearWeights,
    target: LinearWeights,
}

/// Linear approximator with a frozen target copy.
pub struct LinearQ {
    live: RwLock<Arc<LinearWeights>>,
    target: RwLock<Arc<LinearWeights>>,
    learning_rate: f32,
}

impl LinearQ {
    /// Zero-initialised approximator. Target starts equal to live.
    pub fn new(n_features: usize, n_actions: usize, learning_rate: f32) -> Self {
        Self::with_weights(LinearWeights::zeros(n_features, n_actions), learning_rate)
    }

    pub fn with_weights(weights: LinearWeights, learning_rate: f32) -> Self {
        let weights = Arc::new(weights);
        Self {
            live: RwLock::new(Arc::clone(&weights)),
            target: RwLock::new(weights),
            learning_rate,
        }
    }

    /// Current live weight snapshot.
    pub fn live_weights(&self) -> Arc<LinearWeights> {
        Arc::clone(&*self.live.read())
    }

    /// Current target weight snapshot.
    pub fn target_weights(&self) -> Arc<LinearWeights> {
        Arc::clone(&*self.target.read())
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl QFunction for LinearQ {
    // Read-modify-swap of the live snapshot would lose updates if two
    // workers trained at once.
    const CONCURRENT_TRAIN: bool = false;

    fn n_actions(&self) -> usize {
        self.live.read().n_actions
    }

    fn predict(&self, state: &[f32]) -> Result<Vec<f32>, ModelError> {
        self.live_weights().q_values(state)
    }

    fn predict_target(&self, state: &[f32]) -> Result<Vec<f32>, ModelError> {
        self.target_weights().q_values(state)
    }

    fn train_step(&self, batch: TrainBatch<'_>) -> Result<(), ModelError> {
        let mut next = LinearWeights::clone(&self.live_weights());
        let nf = next.n_features;

        for ((state, &action), &ret) in batch.states.iter().zip(batch.actions).zip(batch.returns) {
            if action >= next.n_actions {
                return Err(ModelError::Shape {
                    expected: next.n_actions,
                    actual: action,
                });
            }
            let q = next.q_values(state)?[action];
            let step = self.learning_rate * (ret - q);
            for (w, x) in next.weights[action * nf..(action + 1) * nf].iter_mut().zip(state) {
                *w += step * x;
            }
            next.bias[action] += step;
        }

        if !next.is_finite() {
            return Err(ModelError::Diverged(
                "non-finite weights after update".to_string(),
            ));
        }
        *self.live.write() = Arc::new(next);
        Ok(())
    }

    fn sync_target(&self) -> Result<(), ModelError> {
        let live = self.live_weights();
        *self.target.write() = live;
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>, ModelError> {
        let record = LinearRecord {
            live: LinearWeights::clone(&self.live_weights()),
            target: LinearWeights::clone(&self.target_weights()),
        };
        serde_json::to_vec(&record).map_err(|e| ModelError::Serialization(e.to_string()))
    }

    fn restore(&self, blob: &[u8]) -> Result<(), ModelError> {
        let record: LinearRecord =
            serde_json::from_slice(blob).map_err(|e| ModelError::Serialization(e.to_string()))?;
        record.live.check_dims()?;
        record.target.check_dims()?;

        let current = self.live_weights();
        let same_shape = |w: &LinearWeights| {
            w.n_features == current.n_features && w.n_actions == current.n_actions
        };
        if !same_shape(&record.live) || !same_shape(&record.target) {
            return Err(ModelError::Shape {
                expected: current.n_features * current.n_actions,
                actual: record.live.n_features * record.live.n_actions,
            });
        }

        *self.live.write() = Arc::new(record.live);
        *self.target.write() = Arc::new(record.target);
        Ok(())
    }
}
