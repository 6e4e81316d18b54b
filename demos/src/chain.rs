//! Chain walk: a corridor of `length` cells with the goal at the right end.
//!
//! The observation is a one-hot encoding of the current cell, so a linear
//! Q-function can represent the optimal values exactly. Episodes start in
//! the leftmost cell and end at the goal (reward 1) or after `max_steps`.

use async_qlearn::{EnvError, Environment, StepMode, StepOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct ChainWalk {
    length: usize,
    max_steps: usize,
    position: usize,
    steps: usize,
    slip: f64,
    rng: StdRng,
}

impl ChainWalk {
    pub const RIGHT: usize = 1;
    pub const N_ACTIONS: usize = 2;

    pub fn new(length: usize, max_steps: usize, seed: u64) -> Self {
        Self {
            length: length.max(2),
            max_steps,
            position: 0,
            steps: 0,
            slip: 0.1,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn observe(&self) -> Vec<f32> {
        let mut obs = vec![0.0; self.length];
        obs[self.position] = 1.0;
        obs
    }
}

impl Environment for ChainWalk {
    fn n_actions(&self) -> usize {
        Self::N_ACTIONS
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        self.position = 0;
        self.steps = 0;
        Ok(self.observe())
    }

    fn step(&mut self, action: usize, mode: StepMode) -> Result<StepOutcome, EnvError> {
        if action >= Self::N_ACTIONS {
            return Err(EnvError::InvalidAction {
                action,
                n_actions: Self::N_ACTIONS,
            });
        }

        // Test episodes are deterministic.
        let slipped = mode == StepMode::Train && self.rng.gen_bool(self.slip);
        let go_right = (action == Self::RIGHT) != slipped;
        self.position = if go_right {
            (self.position + 1).min(self.length - 1)
        } else {
            self.position.saturating_sub(1)
        };
        self.steps += 1;

        let at_goal = self.position == self.length - 1;
        let reward = if at_goal { 1.0 } else { 0.0 };
        let terminal = at_goal || self.steps >= self.max_steps;
        Ok(StepOutcome::new(self.observe(), reward, terminal))
    }

    fn render(&mut self) {
        let row: String = (0..self.length)
            .map(|i| if i == self.position { 'o' } else { '.' })
            .collect();
        log::trace!("[{}]", row);
    }
}
