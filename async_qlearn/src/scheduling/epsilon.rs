//! Per-worker epsilon annealing.
//!
//! Every worker anneals its exploration rate linearly from `eps_start` down
//! to its own floor `eps_min` over `eps_steps` global frames. The floor is
//! drawn once per worker from a categorical distribution over candidate
//! minima, so different workers keep exploring at different rates for the
//! whole run.

use crate::error::ConfigError;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Linear epsilon schedule of one worker. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonSchedule {
    eps_start: f64,
    eps_min: f64,
    eps_steps: u64,
}

impl EpsilonSchedule {
    /// Create a schedule.
    ///
    /// # Panics (debug only)
    ///
    /// Panics if `eps_min > eps_start` or either value is not finite.
    pub fn new(eps_start: f64, eps_min: f64, eps_steps: u64) -> Self {
        debug_assert!(
            eps_start.is_finite() && eps_min.is_finite(),
            "EpsilonSchedule: epsilons must be finite, got start={} min={}",
            eps_start,
            eps_min
        );
        debug_assert!(
            eps_min <= eps_start,
            "EpsilonSchedule: eps_min ({}) must not exceed eps_start ({})",
            eps_min,
            eps_start
        );
        Self {
            eps_start,
            eps_min,
            eps_steps,
        }
    }

    /// Exploration rate at global frame `frame`, in `[eps_min, eps_start]`.
    ///
    /// From `eps_steps` on the floor is returned exactly.
    pub fn value(&self, frame: u64) -> f64 {
        if self.eps_steps == 0 || frame >= self.eps_steps {
            return self.eps_min;
        }
        let progress = frame as f64 / self.eps_steps as f64;
        let eps = self.eps_start - progress * (self.eps_start - self.eps_min);
        eps.clamp(self.eps_min, self.eps_start)
    }

    pub fn eps_start(&self) -> f64 {
        self.eps_start
    }

    pub fn eps_min(&self) -> f64 {
        self.eps_min
    }

    pub fn eps_steps(&self) -> u64 {
        self.eps_steps
    }
}

/// Candidate floors and their sampling weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsilonCandidates {
    pub values: Vec<f64>,
    pub weights: Vec<f64>,
}

impl Default for EpsilonCandidates {
    /// 0.1 with weight 0.4, 0.01 and 0.5 with weight 0.3 each.
    fn default() -> Self {
        Self {
            values: vec![0.1, 0.01, 0.5],
            weights: vec![0.4, 0.3, 0.3],
        }
    }
}

impl EpsilonCandidates {
    pub fn new(values: Vec<f64>, weights: Vec<f64>) -> Self {
        Self { values, weights }
    }

    /// A single floor drawn with certainty.
    pub fn fixed(eps_min: f64) -> Self {
        Self::new(vec![eps_min], vec![1.0])
    }

    /// Check the candidates form a distribution over `[0, eps_start]`.
    pub fn validate(&self, eps_start: f64) -> Result<(), ConfigError> {
        if self.values.is_empty() {
            return Err(ConfigError::EpsilonCandidates("no candidate minima".into()));
        }
        if self.values.len() != self.weights.len() {
            return Err(ConfigError::EpsilonCandidates(format!(
                "{} candidates but {} weights",
                self.values.len(),
                self.weights.len()
            )));
        }
        if let Some(v) = self
            .values
            .iter()
            .find(|v| !v.is_finite() || **v < 0.0 || **v > eps_start)
        {
            return Err(ConfigError::EpsilonCandidates(format!(
                "candidate {} outside [0, {}]",
                v, eps_start
            )));
        }
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::EpsilonCandidates(
                "weights must be finite and non-negative".into(),
            ));
        }
        if self.weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::EpsilonCandidates("weights sum to zero".into()));
        }
        Ok(())
    }
}

/// Seeded categorical sampler over candidate floors.
pub struct EpsilonSampler {
    values: Vec<f64>,
    index: WeightedIndex<f64>,
    rng: StdRng,
}

impl EpsilonSampler {
    pub fn new(candidates: &EpsilonCandidates, seed: u64) -> Result<Self, ConfigError> {
        let index = WeightedIndex::new(&candidates.weights)
            .map_err(|e| ConfigError::EpsilonCandidates(e.to_string()))?;
        Ok(Self {
            values: candidates.values.clone(),
            index,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Draw one floor.
    pub fn draw(&mut self) -> f64 {
        self.values[self.index.sample(&mut self.rng)]
    }

    /// Draw a schedule for the next worker.
    pub fn schedule(&mut self, eps_start: f64, eps_steps: u64) -> EpsilonSchedule {
        EpsilonSchedule::new(eps_start, self.draw(), eps_steps)
    }
}
