//! Interleaving driver: exploration state, actor queues, choice strategies
//! and the random and exhaustive exploration loops.

pub mod choice;
pub mod exhaustive;
pub mod interleave;
pub mod queue;
pub mod state;

pub use choice::{ChoiceStrategy, IndexChoice, RandomChoice, ReplayChoice};
pub use exhaustive::{ExhaustiveLimits, ExhaustiveOutcome, explore_exhaustive};
pub use interleave::{
    DEFAULT_MAX_LOG_ENTRIES, choose_and_commit, commit_actor, drive, select_candidates,
};
pub use queue::{ActorQueue, SelectionPredicate};
pub use state::{CommittedEntry, DriveResult, ExplorationFailure, ExplorationState};
