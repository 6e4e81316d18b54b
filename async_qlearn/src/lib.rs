//! # async_qlearn: Asynchronous one-step Q-learning
//!
//! N actor-learner threads, each driving its own environment instance,
//! asynchronously train one shared Q-value approximator. There is no
//! central learner and no replay buffer: every worker submits its own short
//! trajectory segments straight to the shared model.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Coordinator                                │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Thread 0          Thread 1          Thread N                       │
//! │  ┌────────┐        ┌────────┐        ┌────────┐                     │
//! │  │Worker 0│        │Worker 1│        │Worker N│                     │
//! │  │ env    │        │ env    │        │ env    │                     │
//! │  │ ε-floor│        │ ε-floor│        │ ε-floor│                     │
//! │  │ duties │        │        │        │        │                     │
//! │  └───┬────┘        └───┬────┘        └───┬────┘                     │
//! │      │  predict / predict_target / train_step                       │
//! │      └─────────────────┼─────────────────┘                          │
//! │                        ▼                                            │
//! │   ┌──────────────┐  ┌─────────────────┐  ┌────────────────┐         │
//! │   │ FrameCounter │  │  SharedModel    │  │ CompletionFlag │         │
//! │   │ (atomic)     │  │ live + target   │  │ (idempotent)   │         │
//! │   └──────────────┘  └─────────────────┘  └────────────────┘         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Worker 0 carries the coordinator duties: target sync every
//! `update_interval` frames, and a checkpoint plus greedy evaluation every
//! `log_interval` frames at episode boundaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use async_qlearn::{shared_model, Coordinator, LinearQ, TrainerConfig};
//!
//! let config = TrainerConfig::new()
//!     .with_threads(8)
//!     .with_total_frames(1_000_000)
//!     .with_checkpoint_dir("logs/")
//!     .build()?;
//!
//! let model = shared_model(LinearQ::new(n_features, n_actions, 0.01));
//! let summary = Coordinator::new(config)?.run(model.clone(), |id| MyEnv::new(id))?;
//! ```

pub mod actors;
pub mod checkpoint;
pub mod core;
pub mod environment;
pub mod error;
pub mod evaluation;
pub mod messages;
pub mod metrics;
pub mod model;
pub mod runners;
pub mod scheduling;

#[cfg(test)]
mod testing;

// Shared-state primitives
pub use crate::core::completion::{completion_flag, CompletionFlag, SharedCompletionFlag};
pub use crate::core::frame_counter::{frame_counter, FrameCounter, SharedFrameCounter};
pub use crate::core::segment::{TrainBatch, TrajectorySegment};
pub use crate::core::target_sync::TargetSynchronizer;

pub use error::{CheckpointError, ConfigError, EnvError, ModelError, TrainError};

// Model and environment capabilities
pub use model::{shared_model, LinearQ, LinearWeights, QFunction, SharedModel, SharedModelHandle};
pub use environment::{env_handle, EnvHandle, Environment, StepMode, StepOutcome};

pub use scheduling::{EpsilonCandidates, EpsilonSampler, EpsilonSchedule};

pub use actors::{ActorConfig, ActorLearner, CoordinatorDuties, DutyRelay, Role};
pub use evaluation::{EvalResult, Evaluator};
pub use messages::{CoordinatorMsg, FinishReason, WorkerReport};

// Model checkpointing
pub use checkpoint::{
    Checkpointer, CheckpointerConfig, CheckpointInfo, CheckpointStore, FileCheckpointStore,
};

pub use metrics::{
    ConsoleSink, CsvSink, EpsilonBoard, MemorySink, MetricsRecord, MetricsSink, MultiSink,
};

pub use runners::{evaluate_checkpoint, Coordinator, TrainerConfig, TrainingSummary};
