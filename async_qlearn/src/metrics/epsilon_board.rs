//! Per-worker exploration rates, readable by the designated worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One slot per worker holding its current epsilon.
///
/// Each slot has a single writer (its worker); the values are stored as
/// `f64` bit patterns so publishing is a plain atomic store.
#[derive(Debug)]
pub struct EpsilonBoard {
    slots: Vec<AtomicU64>,
}

impl EpsilonBoard {
    /// Create a board for `n_workers`, every slot starting at `initial`.
    pub fn new(n_workers: usize, initial: f64) -> Self {
        Self {
            slots: (0..n_workers)
                .map(|_| AtomicU64::new(initial.to_bits()))
                .collect(),
        }
    }

    /// Record the current epsilon of `worker_id`. Unknown ids are ignored.
    pub fn publish(&self, worker_id: usize, epsilon: f64) {
        if let Some(slot) = self.slots.get(worker_id) {
            slot.store(epsilon.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn get(&self, worker_id: usize) -> Option<f64> {
        self.slots
            .get(worker_id)
            .map(|s| f64::from_bits(s.load(Ordering::Relaxed)))
    }

    /// Mean epsilon over all workers (0 for an empty board).
    pub fn mean(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .slots
            .iter()
            .map(|s| f64::from_bits(s.load(Ordering::Relaxed)))
            .sum();
        sum / self.slots.len() as f64
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Shared epsilon board.
pub type SharedEpsilonBoard = Arc<EpsilonBoard>;

pub fn epsilon_board(n_workers: usize, initial: f64) -> SharedEpsilonBoard {
    Arc::new(EpsilonBoard::new(n_workers, initial))
}
