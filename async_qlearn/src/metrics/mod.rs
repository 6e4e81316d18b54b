//! Training metrics.
//!
//! - [`MetricsRecord`]: one aggregate per logging tick
//! - [`EpsilonBoard`]: current epsilon of every worker, for averaging
//!
//! ## Sinks
//!
//! - [`ConsoleSink`]: summary line through the `log` facade
//! - [`CsvSink`]: append-only CSV file
//! - [`MemorySink`]: in-memory, for tests and embedding
//! - [`MultiSink`]: combine several sinks

pub mod epsilon_board;
pub mod sink;

pub use epsilon_board::{epsilon_board, EpsilonBoard, SharedEpsilonBoard};
pub use sink::{ConsoleSink, CsvSink, MemorySink, MetricsRecord, MetricsSink, MultiSink};
