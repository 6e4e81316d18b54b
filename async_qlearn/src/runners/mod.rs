//! Training runners.
//!
//! - [`TrainerConfig`]: run configuration, validation, JSON loading
//! - [`Coordinator`]: spawns N actor-learner threads on one shared model,
//!   supervises them and returns a [`TrainingSummary`]
//! - [`evaluate_checkpoint`]: evaluation-only run from the latest checkpoint
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │     Coordinator      │  restore, spawn, render, join
//!                 └──────────┬───────────┘
//!        ┌───────────────────┼───────────────────┐
//!        ▼                   ▼                   ▼
//!   ┌──────────┐        ┌──────────┐        ┌──────────┐
//!   │ Worker 0 │        │ Worker 1 │  ...   │ Worker N │
//!   │ + duties │        │          │        │          │
//!   └────┬─────┘        └────┬─────┘        └────┬─────┘
//!        │   predict / train_step / frame counter │
//!        └───────────────────┼───────────────────┘
//!                            ▼
//!              ┌───────────────────────────┐
//!              │ SharedModel (live+target) │
//!              └───────────────────────────┘
//! ```

pub mod config;
pub mod coordinator;

#[cfg(test)]
pub mod tests;

pub use config::TrainerConfig;
pub use coordinator::{evaluate_checkpoint, Coordinator, TrainingSummary};
