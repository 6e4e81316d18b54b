//! n-step trajectory segments and the batch view submitted for training.

/// Clip a raw environment reward into `[-1, 1]`.
///
/// NaN rewards are mapped to 0 so they never reach a stored return.
#[inline]
pub fn clip_reward(reward: f32) -> f32 {
    if reward.is_nan() {
        0.0
    } else {
        reward.clamp(-1.0, 1.0)
    }
}

/// Index of the first maximal value.
///
/// Ties resolve to the lowest index. NaN entries never win. Returns `None`
/// only for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            None if !v.is_nan() => best = Some((i, v)),
            Some((_, b)) if v > b => best = Some((i, v)),
            _ => {}
        }
    }
    match best {
        Some((i, _)) => Some(i),
        None if values.is_empty() => None,
        None => Some(0),
    }
}

/// Largest value in the slice, ignoring NaN. Empty slices yield 0.
pub fn max_value(values: &[f32]) -> f32 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(0.0)
}

/// Borrowed states/actions/returns columns handed to `train_step`.
#[derive(Debug, Clone, Copy)]
pub struct TrainBatch<'a> {
    pub states: &'a [Vec<f32>],
    pub actions: &'a [usize],
    pub returns: &'a [f32],
}

impl TrainBatch<'_> {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether all three columns have the same length.
    pub fn is_consistent(&self) -> bool {
        self.states.len() == self.actions.len() && self.actions.len() == self.returns.len()
    }
}

/// Ordered (state, action, return) tuples collected for one gradient update.
///
/// Never holds more than `capacity` (`tmax`) steps. The stored return is the
/// clipped reward, bootstrapped with the target network unless the step was
/// terminal.
#[derive(Debug, Clone)]
pub struct TrajectorySegment {
    states: Vec<Vec<f32>>,
    actions: Vec<usize>,
    returns: Vec<f32>,
    capacity: usize,
    terminal: bool,
}

impl TrajectorySegment {
    /// Create an empty segment holding at most `capacity` steps.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            returns: Vec::with_capacity(capacity),
            capacity,
            terminal: false,
        }
    }

    /// Append one step. Returns `false` (and stores nothing) when full.
    pub fn push(&mut self, state: Vec<f32>, action: usize, ret: f32) -> bool {
        if self.is_full() {
            return false;
        }
        self.states.push(state);
        self.actions.push(action);
        self.returns.push(ret);
        true
    }

    /// Mark that the last pushed step ended the episode.
    pub fn mark_terminal(&mut self) {
        self.terminal = true;
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.states.len() >= self.capacity
    }

    /// Whether the segment must be flushed to the model now.
    pub fn ready(&self) -> bool {
        !self.is_empty() && (self.is_full() || self.terminal)
    }

    pub fn returns(&self) -> &[f32] {
        &self.returns
    }

    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    pub fn as_batch(&self) -> TrainBatch<'_> {
        TrainBatch {
            states: &self.states,
            actions: &self.actions,
            returns: &self.returns,
        }
    }

    /// Drop all steps and the terminal mark, keeping allocations.
    pub fn clear(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.returns.clear();
        self.terminal = false;
    }
}
