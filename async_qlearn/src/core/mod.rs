//! Shared-state primitives and per-segment data types.

pub mod completion;
pub mod frame_counter;
pub mod segment;
pub mod target_sync;

pub use completion::{completion_flag, CompletionFlag, SharedCompletionFlag};
pub use frame_counter::{frame_counter, FrameCounter, SharedFrameCounter};
pub use segment::{argmax, clip_reward, max_value, TrainBatch, TrajectorySegment};
pub use target_sync::{sync_due, TargetSynchronizer};
