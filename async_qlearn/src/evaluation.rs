//! Greedy-policy test episodes.
//!
//! Evaluation steps the environment in [`StepMode::Test`] and never touches
//! the frame counter, the segment or the model weights.

use crate::core::segment::{argmax, max_value};
use crate::environment::{Environment, StepMode};
use crate::error::TrainError;
use crate::model::{QFunction, SharedModel};

/// Per-episode rewards and the max-Q trace of a batch of test episodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalResult {
    /// Undiscounted raw reward of each episode.
    pub rewards: Vec<f64>,
    /// `max_a Q(s, a)` of every state the greedy policy acted in.
    pub max_qs: Vec<f64>,
}

impl EvalResult {
    pub fn episodes(&self) -> usize {
        self.rewards.len()
    }

    pub fn mean_reward(&self) -> f64 {
        mean(&self.rewards)
    }

    pub fn mean_max_q(&self) -> f64 {
        mean(&self.max_qs)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Runs greedy test episodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluator {
    test_iter: usize,
    max_steps: u64,
}

impl Evaluator {
    /// `test_iter` episodes per call of [`run`](Self::run); every episode is
    /// cut off after `max_steps` steps.
    pub fn new(test_iter: usize, max_steps: u64) -> Self {
        Self {
            test_iter,
            max_steps,
        }
    }

    pub fn test_iter(&self) -> usize {
        self.test_iter
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps
    }

    /// Run the configured number of test episodes.
    pub fn run<E, Q>(&self, env: &mut E, model: &SharedModel<Q>) -> Result<EvalResult, TrainError>
    where
        E: Environment + ?Sized,
        Q: QFunction,
    {
        self.run_test_episodes(env, model, self.test_iter)
    }

    /// Run `n` greedy episodes against `env`.
    ///
    /// The environment is left at the end of the last episode; the caller
    /// must reset it before training on it again.
    pub fn run_test_episodes<E, Q>(
        &self,
        env: &mut E,
        model: &SharedModel<Q>,
        n: usize,
    ) -> Result<EvalResult, TrainError>
    where
        E: Environment + ?Sized,
        Q: QFunction,
    {
        let mut result = EvalResult {
            rewards: Vec::with_capacity(n),
            max_qs: Vec::new(),
        };

        for _ in 0..n {
            let mut state = env.reset()?;
            let mut episode_reward = 0.0f64;
            let mut steps = 0u64;

            loop {
                let q = model.predict(&state)?;
                result.max_qs.push(f64::from(max_value(&q)));
                let action = argmax(&q).unwrap_or(0);

                let outcome = env.step(action, StepMode::Test)?;
                episode_reward += f64::from(outcome.reward);
                steps += 1;
                state = outcome.state;

                if outcome.terminal || steps >= self.max_steps {
                    break;
                }
            }

            log::debug!("Test episode: reward {:.3} in {} steps", episode_reward, steps);
            result.rewards.push(episode_reward);
        }

        Ok(result)
    }
}
