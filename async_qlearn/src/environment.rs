//! Environment abstraction for actor-learners.
//!
//! Each worker drives its own instance; instances never share mutable state.
//! The coordinator keeps a handle to every instance so it can render while
//! training runs, hence the per-instance mutex in [`EnvHandle`]. The worker
//! is the only other party taking that lock, so it is effectively
//! uncontended unless rendering is enabled.

use crate::error::EnvError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Whether a step belongs to training or to a greedy evaluation episode.
///
/// Environments may use this to disable training-only behaviour (random
/// no-op starts, sticky actions, episode-life termination).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Train,
    Test,
}

/// Result of one environment step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Observation after the step.
    pub state: Vec<f32>,
    /// Raw (unclipped) reward.
    pub reward: f32,
    /// Episode ended.
    pub terminal: bool,
    /// Free-form diagnostic note; not used by the trainer.
    pub info: Option<String>,
}

impl StepOutcome {
    pub fn new(state: Vec<f32>, reward: f32, terminal: bool) -> Self {
        Self {
            state,
            reward,
            terminal,
            info: None,
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

/// Single-instance discrete-action environment.
pub trait Environment: Send {
    /// Size of the discrete action space.
    fn n_actions(&self) -> usize;

    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<Vec<f32>, EnvError>;

    /// Apply `action` and advance one frame.
    fn step(&mut self, action: usize, mode: StepMode) -> Result<StepOutcome, EnvError>;

    /// Draw the current frame. Default is a no-op for headless environments.
    fn render(&mut self) {}
}

/// Shared handle to one worker's environment instance.
pub type EnvHandle<E> = Arc<Mutex<E>>;

/// Wrap an environment into a handle.
pub fn env_handle<E: Environment>(env: E) -> EnvHandle<E> {
    Arc::new(Mutex::new(env))
}
