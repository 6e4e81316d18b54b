//! Exploration scheduling.
//!
//! - [`EpsilonSchedule`]: linear anneal from `eps_start` to a per-worker floor
//! - [`EpsilonCandidates`]: configured floors and their weights
//! - [`EpsilonSampler`]: seeded categorical draw of one floor per worker
//!
//! ## Example
//!
//! ```rust
//! use async_qlearn::scheduling::{EpsilonCandidates, EpsilonSampler};
//!
//! let mut sampler = EpsilonSampler::new(&EpsilonCandidates::default(), 201).unwrap();
//! let schedule = sampler.schedule(1.0, 4_000_000);
//! assert_eq!(schedule.value(0), 1.0);
//! assert_eq!(schedule.value(4_000_000), schedule.eps_min());
//! ```

pub mod epsilon;


pub use epsilon::{EpsilonCandidates, EpsilonSampler, EpsilonSchedule};
