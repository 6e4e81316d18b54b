//! Error types for the trainer and its collaborators.

use std::io;
use std::path::PathBuf;

/// Failure reported by an environment instance.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// `reset` could not produce an initial observation.
    #[error("environment reset failed: {0}")]
    Reset(String),
    /// `step` failed for the given action.
    #[error("environment step failed for action {action}: {reason}")]
    Step { action: usize, reason: String },
    /// Action index outside the action space.
    #[error("action {action} out of range (n_actions = {n_actions})")]
    InvalidAction { action: usize, n_actions: usize },
}

/// Failure reported by the value-function approximator.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Forward pass failed.
    #[error("inference failed: {0}")]
    Inference(String),
    /// Update produced non-finite weights and was rejected.
    #[error("training step diverged: {0}")]
    Diverged(String),
    /// Input does not match the approximator's expected dimensions.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: usize, actual: usize },
    /// Batch columns have different lengths.
    #[error("malformed batch: {states} states, {actions} actions, {returns} returns")]
    MalformedBatch {
        states: usize,
        actions: usize,
        returns: usize,
    },
    /// Weights could not be encoded or decoded.
    #[error("weight serialization failed: {0}")]
    Serialization(String),
}

/// Failure while persisting or restoring a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid checkpoint metadata at {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },
    #[error("unsupported checkpoint format version {found} (expected {expected})")]
    FormatVersion { found: u32, expected: u32 },
    #[error("checkpoint not found for frame {0}")]
    NotFound(u64),
    #[error("no checkpoints found")]
    NoCheckpoints,
    #[error("model restore failed: {0}")]
    Model(#[from] ModelError),
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A count parameter must be positive.
    #[error("{field} must be > 0, got {value}")]
    InvalidCount { field: &'static str, value: u64 },
    /// A parameter is outside its valid range.
    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Candidate minima and their weights do not form a distribution.
    #[error("invalid epsilon candidates: {0}")]
    EpsilonCandidates(String),
    /// Config file could not be read or parsed.
    #[error("failed to load config: {0}")]
    Load(String),
}

/// Top-level error returned by a training or evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("failed to spawn worker {worker_id}: {source}")]
    WorkerSpawn {
        worker_id: usize,
        #[source]
        source: io::Error,
    },
    #[error("worker {worker_id} failed: {reason}")]
    WorkerFailed { worker_id: usize, reason: String },
}
