//! Configuration for asynchronous Q-learning training.

use crate::error::ConfigError;
use crate::scheduling::EpsilonCandidates;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a training (or evaluation-only) run.
///
/// Every field has a default, so a JSON file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    // Workers
    /// Number of actor-learner threads
    pub threads: usize,
    /// Global frame budget (stopping condition)
    pub total_frames: u64,

    // Q-learning
    /// Frames between target network syncs
    pub update_interval: u64,
    /// Discount factor
    pub gamma: f32,
    /// Maximum segment length per training step
    pub tmax: usize,

    // Exploration
    /// Frames over which epsilon anneals to the worker's floor
    pub eps_steps: u64,
    /// Initial epsilon of every worker
    pub eps_start: f64,
    /// Floors drawn per worker and their weights
    pub eps_min_candidates: EpsilonCandidates,

    // Logging, evaluation, checkpointing
    /// Frames between checkpoint saves and between evaluations
    pub log_interval: u64,
    /// Test episodes per evaluation during training
    pub test_iter: usize,
    /// Test episodes of an evaluation-only run
    pub eval_iter: usize,
    /// Step cap of one test episode
    pub eval_max_steps: u64,
    /// Checkpoint directory
    pub checkpoint_dir: PathBuf,
    /// Checkpoints retained (0 = keep all)
    pub keep_checkpoints: usize,

    // Lifecycle
    /// Render every environment while training runs
    pub render: bool,
    /// Coordinator polling period in milliseconds
    pub render_poll_ms: u64,
    /// Start from scratch when the latest checkpoint cannot be restored
    pub allow_cold_start: bool,
    /// Stop the whole run when any worker fails
    pub abort_on_worker_failure: bool,
    /// Seed of the floor draw and the workers' exploration RNGs
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            threads: 16,
            total_frames: 40_000_000,

            update_interval: 40_000,
            gamma: 0.99,
            tmax: 5,

            eps_steps: 4_000_000,
            eps_start: 1.0,
            eps_min_candidates: EpsilonCandidates::default(),

            log_interval: 80_000,
            test_iter: 3,
            eval_iter: 1,
            eval_max_steps: 100_000,
            checkpoint_dir: PathBuf::from("logs/"),
            keep_checkpoints: 2,

            render: false,
            render_poll_ms: 10,
            allow_cold_start: false,
            abort_on_worker_failure: false,
            seed: 201,
        }
    }
}

impl TrainerConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.build()
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Validate all configuration parameters.
    ///
    /// # Validation Rules
    /// - Count parameters (threads, tmax, intervals, budgets) must be > 0
    /// - gamma and eps_start must be in [0.0, 1.0]
    /// - every candidate floor must be in [0.0, eps_start], weights must be
    ///   non-negative with a positive sum
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts: [(&'static str, u64); 6] = [
            ("threads", self.threads as u64),
            ("tmax", self.tmax as u64),
            ("total_frames", self.total_frames),
            ("update_interval", self.update_interval),
            ("log_interval", self.log_interval),
            ("eps_steps", self.eps_steps),
        ];
        if let Some(&(field, value)) = counts.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::InvalidCount { field, value });
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::OutOfRange {
                field: "gamma",
                value: f64::from(self.gamma),
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.eps_start) {
            return Err(ConfigError::OutOfRange {
                field: "eps_start",
                value: self.eps_start,
                min: 0.0,
                max: 1.0,
            });
        }

        self.eps_min_candidates.validate(self.eps_start)
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    // Builder methods for workers

    /// Set the number of actor-learner threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the global frame budget.
    pub fn with_total_frames(mut self, total_frames: u64) -> Self {
        self.total_frames = total_frames;
        self
    }

    // Builder methods for Q-learning

    /// Set the frames between target network syncs.
    pub fn with_update_interval(mut self, frames: u64) -> Self {
        self.update_interval = frames;
        self
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

    // Builder methods for exploration

    /// Set the frames over which epsilon anneals.
    pub fn with_eps_steps(mut self, frames: u64) -> Self {
        self.eps_steps = frames;
        self
    }

    /// Set the initial epsilon.
    pub fn with_eps_start(mut self, eps: f64) -> Self {
        self.eps_start = eps;
        self
    }

    /// Set the epsilon floors and their draw weights.
    pub fn with_eps_min_candidates(mut self, candidates: EpsilonCandidates) -> Self {
        self.eps_min_candidates = candidates;
        self
    }

    // Builder methods for logging and checkpointing

    /// Set the checkpoint and evaluation interval.
    pub fn with_log_interval(mut self, frames: u64) -> Self {
        self.log_interval = frames;
        self
    }

    /// Set the test episodes per evaluation.
    pub fn with_test_iter(mut self, episodes: usize) -> Self {
        self.test_iter = episodes;
        self
    }

    /// Set the test episodes of an evaluation-only run.
    pub fn with_eval_iter(mut self, episodes: usize) -> Self {
        self.eval_iter = episodes;
        self
    }

    /// Set the step cap of one test episode.
    pub fn with_eval_max_steps(mut self, steps: u64) -> Self {
        self.eval_max_steps = steps;
        self
    }

    /// Set the checkpoint directory.
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    /// Set how many checkpoints are retained (0 = all).
    pub fn with_keep_checkpoints(mut self, n: usize) -> Self {
        self.keep_checkpoints = n;
        self
    }

    // Builder methods for lifecycle

    /// Enable or disable rendering.
    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    /// Set the coordinator polling period.
    pub fn with_render_poll_ms(mut self, ms: u64) -> Self {
        self.render_poll_ms = ms;
        self
    }

    /// Allow starting from scratch when restore fails.
    pub fn with_allow_cold_start(mut self, allow: bool) -> Self {
        self.allow_cold_start = allow;
        self
    }

    /// Stop the whole run when any worker fails.
    pub fn with_abort_on_worker_failure(mut self, abort: bool) -> Self {
        self.abort_on_worker_failure = abort;
        self
    }

    /// Set the seed of the floor draw and the exploration RNGs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
