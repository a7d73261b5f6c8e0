//! Applies one log entry: transition, invariant check, diff, reactions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::driver::queue::ActorQueue;
use crate::error::ExplorationResult;
use crate::invariants::InvariantChecker;
use crate::model::{ActorId, LogEntry, MessageId, Replica};

use super::collaborators::{ActorState, ClusterModel, Messenger, NoopMessenger};

/// What happened while applying one entry, kept alongside it in the log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransitionDebug {
    /// Actors asked for reactions, in order.
    pub active: Vec<ActorId>,
    /// Non-empty reactions per actor, in order.
    pub reactions: Vec<(ActorId, Vec<LogEntry>)>,
}

/// Output of [`TransitionEngine::apply`].
#[derive(Debug, Clone)]
pub struct Applied<D> {
    /// The committed entry, with its message id.
    pub entry: LogEntry,
    /// Snapshot after the entry.
    pub replica: Replica,
    /// Model diff for the transition.
    pub diff: D,
    /// Queues with reactions appended.
    pub queues: BTreeMap<ActorId, ActorQueue>,
    /// Active actors and their reactions.
    pub debug: TransitionDebug,
}

/// Applies entries through a [`ClusterModel`] and checks every transition.
pub struct TransitionEngine<M: ClusterModel> {
    model: M,
    checker: InvariantChecker,
    messenger: Arc<dyn Messenger>,
}

impl<M: ClusterModel> TransitionEngine<M> {
    /// An engine running the standard invariants.
    pub fn new(model: M) -> Self {
        Self::with_checker(model, InvariantChecker::standard())
    }

    /// An engine running a custom invariant set.
    pub fn with_checker(model: M, checker: InvariantChecker) -> Self {
        Self {
            model,
            checker,
            messenger: Arc::new(NoopMessenger),
        }
    }

    /// Replace the messenger injected into actor state.
    pub fn with_messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = messenger;
        self
    }

    /// The model under test.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// The invariant checker.
    pub fn checker(&self) -> &InvariantChecker {
        &self.checker
    }

    /// Actors that get to react to `entry`.
    ///
    /// Every joined group and peer of `new`, plus, for membership-protocol
    /// commands, the actors named under the fixed activation roles. The
    /// latter lets an actor react to its own admission or removal while it
    /// is not (or no longer) a member.
    pub fn active_actors(entry: &LogEntry, new: &Replica) -> Vec<ActorId> {
        let mut active: BTreeSet<ActorId> = new
            .groups()
            .iter()
            .cloned()
            .map(ActorId::Group)
            .chain(new.peers().iter().cloned().map(ActorId::Peer))
            .collect();
        active.extend(entry.activated_actors());
        active.into_iter().collect()
    }

    /// Commit `entry` at `message_id` on top of `old`.
    ///
    /// Fails only if a transition invariant is violated.
    pub fn apply(
        &self,
        old: &Replica,
        mut queues: BTreeMap<ActorId, ActorQueue>,
        mut entry: LogEntry,
        message_id: MessageId,
    ) -> ExplorationResult<Applied<M::Diff>> {
        entry.message_id = Some(message_id);

        let new = self
            .model
            .transition(&entry, old.clone().with_version(message_id));

        self.checker.check(old, &new, &entry)?;

        let diff = self.model.replica_diff(&entry, old, &new);

        let active = Self::active_actors(&entry, &new);
        let mut reactions = Vec::new();
        for actor in &active {
            let state = ActorState::new(actor.clone(), self.messenger.clone());
            let reaction = self.model.reactions(&entry, old, &new, &diff, &state);
            if reaction.is_empty() {
                continue;
            }
            tracing::trace!(
                actor = %actor,
                count = reaction.len(),
                "actor reacts to {}",
                entry
            );
            queues
                .entry(actor.clone())
                .or_default()
                .extend(reaction.iter().cloned());
            reactions.push((actor.clone(), reaction));
        }

        tracing::debug!(
            message_id = message_id.0,
            kind = %entry.kind,
            active = active.len(),
            reacting = reactions.len(),
            "entry applied"
        );

        Ok(Applied {
            entry,
            replica: new,
            diff,
            queues,
            debug: TransitionDebug { active, reactions },
        })
    }
}
