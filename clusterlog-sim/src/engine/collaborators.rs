//! Interfaces to the system under test.
//!
//! The harness never decides how the cluster evolves. A [`ClusterModel`]
//! supplies the deterministic transition function, the per-transition diff
//! and each actor's reactions; the harness only orders the entries and checks
//! the results.

use std::fmt;
use std::sync::Arc;

use crate::model::{ActorId, LogEntry, Replica};

/// The system under test: how a log entry changes the cluster and how actors
/// react to it.
pub trait ClusterModel {
    /// Opaque per-transition summary, consumed only by [`Self::reactions`].
    type Diff: Clone + fmt::Debug;

    /// Apply `entry` to `replica`. Must be pure and deterministic.
    ///
    /// `replica` is an owned clone of the previous snapshot with its version
    /// already set to the entry's message id; editing it never affects the
    /// previous snapshot.
    fn transition(&self, entry: &LogEntry, replica: Replica) -> Replica;

    /// Summarize what changed between `old` and `new`.
    fn replica_diff(&self, entry: &LogEntry, old: &Replica, new: &Replica) -> Self::Diff;

    /// Entries `actor` writes in response to `entry`, in order. Possibly empty.
    fn reactions(
        &self,
        entry: &LogEntry,
        old: &Replica,
        new: &Replica,
        diff: &Self::Diff,
        actor: &ActorState,
    ) -> Vec<LogEntry>;
}

/// Outbound messaging for an actor.
///
/// The harness never sends anything: actors get a [`NoopMessenger`] so that
/// reaction code written against a real messenger can run unchanged.
pub trait Messenger: Send + Sync {
    /// Deliver an entry to the outside world.
    fn publish(&self, entry: &LogEntry);
}

/// A messenger that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMessenger;

impl Messenger for NoopMessenger {
    fn publish(&self, _entry: &LogEntry) {}
}

/// Placeholder state handed to [`ClusterModel::reactions`] for one actor.
#[derive(Clone)]
pub struct ActorState {
    /// The reacting actor.
    pub id: ActorId,
    /// Injected messenger, a no-op inside the harness.
    pub messenger: Arc<dyn Messenger>,
}

impl ActorState {
    /// State for `id` with the given messenger.
    pub fn new(id: ActorId, messenger: Arc<dyn Messenger>) -> Self {
        Self { id, messenger }
    }
}

impl fmt::Debug for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorState").field("id", &self.id).finish()
    }
}
