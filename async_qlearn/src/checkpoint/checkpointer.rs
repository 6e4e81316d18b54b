//! Frame-cadenced checkpoint saving and startup restore.

use super::store::{CheckpointInfo, CheckpointStore};
use crate::error::CheckpointError;
use crate::model::{QFunction, SharedModel};
use std::collections::VecDeque;

/// Checkpointer cadence and retention.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointerConfig {
    /// Save every N frames (at the next episode boundary).
    pub save_interval: u64,
    /// Keep only the last N checkpoints (0 = keep all).
    pub keep_last_n: usize,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            save_interval: 80_000,
            keep_last_n: 2,
        }
    }
}

impl CheckpointerConfig {
    pub fn new(save_interval: u64) -> Self {
        Self {
            save_interval,
            ..Self::default()
        }
    }

    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }
}

/// Saves model snapshots into a [`CheckpointStore`] and prunes old ones.
///
/// Only the designated worker owns a `Checkpointer`, so saves never race.
pub struct Checkpointer<S> {
    store: S,
    config: CheckpointerConfig,
    last_save_frame: u64,
    history: VecDeque<CheckpointInfo>,
}

impl<S: CheckpointStore> Checkpointer<S> {
    /// Wrap `store`. Checkpoints already in it count towards retention.
    pub fn new(store: S, config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        let history = store.list()?.into_iter().collect();
        Ok(Self {
            store,
            config,
            last_save_frame: 0,
            history,
        })
    }

    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn last_save_frame(&self) -> u64 {
        self.last_save_frame
    }

    /// Restart the save cadence from `frame` (after a restore).
    pub fn set_last_save_frame(&mut self, frame: u64) {
        self.last_save_frame = frame;
    }

    /// Checkpoints currently retained, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CheckpointInfo> {
        self.history.iter()
    }

    /// Whether a save is due: at an episode boundary, `save_interval`
    /// frames after the last successful save.
    pub fn should_save(&self, current_frame: u64, is_episode_boundary: bool) -> bool {
        is_episode_boundary
            && current_frame.saturating_sub(self.last_save_frame) >= self.config.save_interval
    }

    /// Save if due. Returns whether a checkpoint was written.
    ///
    /// A failed save leaves the cadence untouched, so the next episode
    /// boundary tries again.
    pub fn maybe_save<Q: QFunction>(
        &mut self,
        model: &SharedModel<Q>,
        current_frame: u64,
        is_episode_boundary: bool,
    ) -> Result<bool, CheckpointError> {
        if !self.should_save(current_frame, is_episode_boundary) {
            return Ok(false);
        }
        self.save(model, current_frame)?;
        Ok(true)
    }

    /// Unconditionally save a snapshot tagged with `frame`.
    pub fn save<Q: QFunction>(
        &mut self,
        model: &SharedModel<Q>,
        frame: u64,
    ) -> Result<CheckpointInfo, CheckpointError> {
        let blob = model.serialize()?;
        let info = self.store.save(frame, &blob)?;
        self.last_save_frame = frame;

        self.history.retain(|c| c.frame != frame);
        self.history.push_back(info.clone());
        log::info!("Saved checkpoint at frame {} ({} bytes)", frame, blob.len());

        // The new checkpoint is written; a failed prune is retried next save.
        if let Err(e) = self.prune() {
            log::warn!("Pruning old checkpoints failed: {}", e);
        }
        Ok(info)
    }

    /// Restore the most recent checkpoint into `model`.
    ///
    /// Returns the frame count it was saved at, or `None` if the store is
    /// empty. The save cadence restarts from the restored frame.
    pub fn restore_latest<Q: QFunction>(
        &mut self,
        model: &SharedModel<Q>,
    ) -> Result<Option<u64>, CheckpointError> {
        let Some(info) = self.store.latest()? else {
            return Ok(None);
        };
        let checkpoint = self.store.load(&info)?;
        model.restore(&checkpoint.blob)?;
        self.last_save_frame = checkpoint.frame();
        Ok(Some(checkpoint.frame()))
    }

    fn prune(&mut self) -> Result<(), CheckpointError> {
        if self.config.keep_last_n == 0 {
            return Ok(());
        }
        while self.history.len() > self.config.keep_last_n {
            let Some(old) = self.history.front() else {
                break;
            };
            self.store.remove(old)?;
            let Some(old) = self.history.pop_front() else {
                break;
            };
            log::debug!("Removed checkpoint at frame {}", old.frame);
        }
        Ok(())
    }
}
