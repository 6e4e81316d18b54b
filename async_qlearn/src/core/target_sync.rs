//! Periodic hard copy of live weights into the target network.
//!
//! The synchronizer is owned by the designated worker's duties and nowhere
//! else, so the target has exactly one writer. Every other worker only reads
//! it through `predict_target`.

use crate::error::ModelError;
use crate::model::{QFunction, SharedModel};

/// Whether a sync is due at `current_frame`.
#[inline]
pub fn sync_due(current_frame: u64, last_sync_frame: u64, interval: u64) -> bool {
    current_frame.saturating_sub(last_sync_frame) >= interval
}

/// Frame-cadenced target network synchronizer.
#[derive(Debug, Clone)]
pub struct TargetSynchronizer {
    interval: u64,
    last_sync_frame: u64,
    syncs: u64,
}

impl TargetSynchronizer {
    /// Create a synchronizer whose cadence starts counting at `start_frame`.
    pub fn new(interval: u64, start_frame: u64) -> Self {
        Self {
            interval,
            last_sync_frame: start_frame,
            syncs: 0,
        }
    }

    /// Copy live weights into the target if `interval` frames have passed.
    ///
    /// Returns whether a copy happened. On error the cadence is not
    /// advanced, so the copy is retried on the next call.
    pub fn maybe_sync<Q: QFunction>(
        &mut self,
        model: &SharedModel<Q>,
        current_frame: u64,
    ) -> Result<bool, ModelError> {
        if !sync_due(current_frame, self.last_sync_frame, self.interval) {
            return Ok(false);
        }
        model.sync_target()?;
        self.last_sync_frame = current_frame;
        self.syncs += 1;
        Ok(true)
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn last_sync_frame(&self) -> u64 {
        self.last_sync_frame
    }

    /// Copies performed by this synchronizer.
    pub fn syncs(&self) -> u64 {
        self.syncs
    }
}
