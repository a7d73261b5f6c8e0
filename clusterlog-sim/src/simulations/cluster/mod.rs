//! A reference cluster model.
//!
//! Implements [`ClusterModel`] for a small cluster: groups join through an
//! observer, register virtual peers, and run jobs placed by a pluggable
//! [`Scheduler`]. The harness tests drive it end to end; swapping in a
//! faulty scheduler shows the invariants catching it.

pub mod diff;
pub mod reactions;
pub mod scheduler;
pub mod transition;
pub mod workload;

pub use diff::ClusterDiff;
pub use reactions::reference_reactions;
pub use scheduler::{BalancedScheduler, Scheduler, task_targets};
pub use transition::{apply_entry, pick_observer};

use crate::engine::{ActorState, ClusterModel, ReactionContext, ReactionRegistry};
use crate::model::{LogEntry, Replica};

/// The reference model, generic over its scheduler.
pub struct ReferenceCluster<S = BalancedScheduler> {
    scheduler: S,
    reactions: ReactionRegistry<ClusterDiff>,
}

impl ReferenceCluster<BalancedScheduler> {
    /// The model with the balanced scheduler.
    pub fn new() -> Self {
        Self::with_scheduler(BalancedScheduler)
    }
}

impl Default for ReferenceCluster<BalancedScheduler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Scheduler> ReferenceCluster<S> {
    /// The model with a custom scheduler.
    pub fn with_scheduler(scheduler: S) -> Self {
        Self {
            scheduler,
            reactions: reference_reactions(),
        }
    }

    /// The scheduler in use.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<S: Scheduler> ClusterModel for ReferenceCluster<S> {
    type Diff = ClusterDiff;

    fn transition(&self, entry: &LogEntry, replica: Replica) -> Replica {
        apply_entry(&self.scheduler, entry, replica)
    }

    fn replica_diff(&self, _entry: &LogEntry, old: &Replica, new: &Replica) -> ClusterDiff {
        ClusterDiff::between(old, new)
    }

    fn reactions(
        &self,
        entry: &LogEntry,
        old: &Replica,
        new: &Replica,
        diff: &ClusterDiff,
        actor: &ActorState,
    ) -> Vec<LogEntry> {
        self.reactions.react(&ReactionContext {
            entry,
            old,
            new,
            diff,
            actor,
        })
    }
}
