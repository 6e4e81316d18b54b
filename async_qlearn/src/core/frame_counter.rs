//! Global frame counter shared by all actor-learners.
//!
//! Every environment step taken by any worker increments this counter exactly
//! once. It is the training budget clock: epsilon annealing, target sync,
//! checkpoint and logging cadences and the completion condition all read it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Atomic, monotonically non-decreasing frame counter.
///
/// `increment` is a single `fetch_add`, so concurrent callers never lose an
/// update and never observe the same post-increment value.
#[derive(Debug)]
pub struct FrameCounter {
    frames: AtomicU64,
}

impl FrameCounter {
    /// Create a counter starting at frame 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a counter resuming from a restored frame count.
    pub fn starting_at(frame: u64) -> Self {
        Self {
            frames: AtomicU64::new(frame),
        }
    }

    /// Count one environment step and return the new total.
    pub fn increment(&self) -> u64 {
        self.frames.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current total.
    ///
    /// May be stale by the time the caller acts on it; cadence decisions only
    /// need the value to become visible eventually.
    pub fn read(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared frame counter (thread-safe reference).
pub type SharedFrameCounter = Arc<FrameCounter>;

/// Create a new shared frame counter starting at `frame`.
pub fn frame_counter(frame: u64) -> SharedFrameCounter {
    Arc::new(FrameCounter::starting_at(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_frame_counter_new() {
        let counter = FrameCounter::new();
        assert_eq!(counter.read(), 0);
    }

    #[test]
    fn test_frame_counter_increment() {
        let counter = FrameCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.read(), 2);
    }

    #[test]
    fn test_frame_counter_resumes() {
        let counter = FrameCounter::starting_at(80_000);
        assert_eq!(counter.increment(), 80_001);
    }

    #[test]
    fn should_count_every_concurrent_increment_exactly_once() {
        let counter = frame_counter(0);
        let threads = 8;
        let per_thread = 5_000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| counter.increment())
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "value {} observed twice", value);
            }
        }

        let total = (threads * per_thread) as u64;
        assert_eq!(counter.read(), total);
        assert_eq!(seen.len() as u64, total);
        assert!(seen.iter().all(|&v| v >= 1 && v <= total));
    }
}
