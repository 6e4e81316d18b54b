//! Messages exchanged between workers and the coordinator.
//!
//! ```text
//!    +----------+  +----------+       +----------+
//!    | Worker 0 |  | Worker 1 |  ...  | Worker N |
//!    +----+-----+  +----+-----+       +----+-----+
//!         |             |                  |
//!         +-------------+------------------+
//!                       | WorkerFinished(report)
//!                       v
//!              +-------------------+
//!              |    Coordinator    |
//!              +-------------------+
//! ```
//!
//! Training itself never goes through a channel: workers share the model
//! and the frame counter directly. The channel only carries lifecycle
//! events so the coordinator can stop polling once every worker is done.

mod coordinator_msg;


pub(crate) use coordinator_msg::panic_message;
pub use coordinator_msg::{CoordinatorMsg, FinishReason, WorkerReport};
