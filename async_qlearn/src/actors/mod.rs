//! Actor-learner workers.
//!
//! - `ActorLearner`: one thread driving one environment and training the
//!   shared model on its own segments
//! - `CoordinatorDuties`: target sync, checkpoint and evaluation cadences,
//!   carried by exactly one worker via [`Role::Designated`]

pub mod actor_learner;
pub mod duties;

pub use actor_learner::{ActorConfig, ActorLearner, Role, SharedState};
pub use duties::{CoordinatorDuties, DutyRelay, SharedDutyRelay};
