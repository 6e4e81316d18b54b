//! Model checkpointing.
//!
//! [`CheckpointStore`] is the persistence capability (save/load/list/prune
//! opaque blobs keyed by frame count). [`Checkpointer`] sits on top of it and
//! owns the save cadence, bounded retention and the startup restore.
//!
//! ## Example
//!
//! ```rust,ignore
//! use async_qlearn::checkpoint::{Checkpointer, CheckpointerConfig, FileCheckpointStore};
//!
//! let store = FileCheckpointStore::open("logs/")?;
//! let mut checkpointer = Checkpointer::new(store, CheckpointerConfig::new(80_000))?;
//!
//! // Resume:
//! let start_frame = checkpointer.restore_latest(&model)?.unwrap_or(0);
//!
//! // At an episode boundary of the designated worker:
//! checkpointer.maybe_save(&model, frames.read(), true)?;
//! ```

pub mod checkpointer;
pub mod store;

pub use checkpointer::{Checkpointer, CheckpointerConfig};
pub use store::{
    Checkpoint, CheckpointInfo, CheckpointMeta, CheckpointStore, FileCheckpointStore,
    CHECKPOINT_FORMAT_VERSION,
};
