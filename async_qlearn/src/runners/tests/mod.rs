//! Test suite for the runners module.
//!
//! # Test Organization
//!
//! - `config_tests`: defaults, validation and JSON loading of TrainerConfig
//! - `coordinator_tests`: end-to-end multi-thread runs against stub
//!   environments and models
//!
//! # Critical Invariants Tested
//!
//! 1. **Frame accounting**: every environment step is counted exactly once;
//!    evaluation steps are never counted
//! 2. **Fault isolation**: a failing environment or training step stops at
//!    most its own worker unless abort is configured
//! 3. **Resume**: a restored run continues from the checkpoint frame with the
//!    target synced to the restored weights

pub mod coordinator_tests;
