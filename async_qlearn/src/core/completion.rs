//! Process-wide training completion flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop signal observed by every worker between segments.
///
/// Setting it is idempotent: any number of workers may set it concurrently,
/// exactly one of them is told it was first.
#[derive(Debug, Default)]
pub struct CompletionFlag {
    done: AtomicBool,
}

impl CompletionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` only for the caller that raised it first.
    pub fn set(&self) -> bool {
        !self.done.swap(true, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// Shared completion flag.
pub type SharedCompletionFlag = Arc<CompletionFlag>;

/// Create a new, lowered, shared completion flag.
pub fn completion_flag() -> SharedCompletionFlag {
    Arc::new(CompletionFlag::new())
}
