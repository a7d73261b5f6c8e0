//! The interleaving driver.
//!
//! Each actor's queue is FIFO, but across actors no order is assumed: at
//! every step the driver asks a [`ChoiceStrategy`] which selectable queue to
//! service, the way a coordination service hands out sequence numbers to
//! racing writers. Any sequence of choices is a valid linearization.

use crate::engine::{ClusterModel, TransitionEngine};
use crate::error::ExplorationError;
use crate::model::{ActorId, CommandKind, LogEntry, Replica, args};

use super::choice::ChoiceStrategy;
use super::state::{CommittedEntry, DriveResult, ExplorationFailure, ExplorationState};

/// Default bound on the committed log length.
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 1000;

/// Whether `actor` may write `head` at all.
///
/// Members may always write. A non-member may only write the entries that
/// bring it into the cluster: a group its own prepare-join-cluster (or the
/// abort that restarts it), a peer the add-virtual-peer naming it, once the
/// group named under `group-id` has joined.
fn owner_may_write(replica: &Replica, actor: &ActorId, head: &LogEntry) -> bool {
    match actor {
        ActorId::Group(group) => {
            replica.is_joined_group(group)
                || match head.kind {
                    CommandKind::PrepareJoinCluster => head.group_arg(args::JOINER) == Some(group),
                    CommandKind::AbortJoinCluster => head.group_arg(args::ID) == Some(group),
                    _ => false,
                }
        }
        ActorId::Peer(peer) => {
            replica.is_joined_peer(peer)
                || (head.kind == CommandKind::AddVirtualPeer
                    && head.peer_arg(args::ID) == Some(peer)
                    && head
                        .group_arg(args::GROUP_ID)
                        .is_some_and(|group| replica.is_joined_group(group)))
        }
    }
}

/// Queues whose head entry may be committed now, in actor order.
///
/// A queue is selectable if its head is a peerless command, if its owner is a
/// joined group, or if its owner may write the head and the head passes the
/// queue's predicate. Selection predicates never hold back a joined group.
///
/// Non-members are returned only for their own admission entries: a group
/// for its own prepare-join-cluster or abort, a peer for the add-virtual-peer
/// naming it.
pub fn select_candidates<D>(state: &ExplorationState<D>) -> Vec<ActorId> {
    state
        .queues
        .iter()
        .filter_map(|(actor, queue)| {
            let head = queue.head()?;
            let selectable = head.kind.is_peerless()
                || match actor {
                    ActorId::Group(group) if state.replica.is_joined_group(group) => true,
                    _ => {
                        owner_may_write(&state.replica, actor, head)
                            && queue.head_passes(&state.replica)
                    }
                };
            selectable.then(|| actor.clone())
        })
        .collect()
}

/// Commit the head entry of `actor`'s queue.
///
/// `index` is the candidate index that selected `actor`, recorded for
/// shrinking. On failure the returned state is `state` unchanged.
pub fn commit_actor<M: ClusterModel>(
    mut state: ExplorationState<M::Diff>,
    engine: &TransitionEngine<M>,
    actor: &ActorId,
    index: usize,
) -> DriveResult<M::Diff> {
    let mut queues = state.queues.clone();
    let Some(entry) = queues.get_mut(actor).and_then(|q| q.pop()) else {
        let pending = state.pending();
        let log_len = state.log.len();
        return Err(Box::new(ExplorationFailure::new(
            ExplorationError::Deadlock { pending, log_len },
            state,
        )));
    };
    if queues.get(actor).is_some_and(|q| q.is_empty()) {
        queues.remove(actor);
    }

    let message_id = state.next_message_id;
    match engine.apply(&state.replica, queues, entry, message_id) {
        Ok(applied) => {
            state.replica = applied.replica;
            state.queues = applied.queues;
            state.log.push(CommittedEntry {
                entry: applied.entry,
                diff: applied.diff,
                debug: applied.debug,
            });
            state.choices.push(actor.clone());
            state.choice_indices.push(index);
            state.next_message_id = message_id.next();
            Ok(state)
        }
        Err(error) => Err(Box::new(ExplorationFailure {
            error,
            state,
            failed_choice: Some((actor.clone(), index)),
        })),
    }
}

/// Pick one selectable queue and commit its head entry.
///
/// Fails with [`ExplorationError::Deadlock`] if queues remain but none is
/// selectable.
pub fn choose_and_commit<M: ClusterModel>(
    state: ExplorationState<M::Diff>,
    engine: &TransitionEngine<M>,
    strategy: &mut dyn ChoiceStrategy,
) -> DriveResult<M::Diff> {
    let candidates = select_candidates(&state);
    if candidates.is_empty() {
        let pending = state.pending();
        tracing::warn!(?pending, log_len = state.log.len(), "no selectable queue");
        let log_len = state.log.len();
        return Err(Box::new(ExplorationFailure::new(
            ExplorationError::Deadlock { pending, log_len },
            state,
        )));
    }

    let index = strategy
        .choose(&candidates)
        .min(candidates.len().saturating_sub(1));
    let actor = candidates[index].clone();
    tracing::trace!(actor = %actor, candidates = candidates.len(), "queue chosen");
    commit_actor(state, engine, &actor, index)
}

/// Commit entries until every queue has drained.
///
/// Fails with [`ExplorationError::Overflow`] once the log grows past
/// `max_log_entries`, which catches reaction cascades that never settle.
pub fn drive<M: ClusterModel>(
    mut state: ExplorationState<M::Diff>,
    engine: &TransitionEngine<M>,
    strategy: &mut dyn ChoiceStrategy,
    max_log_entries: usize,
) -> DriveResult<M::Diff> {
    while !state.is_done() {
        state = choose_and_commit(state, engine, strategy)?;
        if state.log.len() > max_log_entries {
            tracing::warn!(
                limit = max_log_entries,
                pending = state.queues.len(),
                "log overflow"
            );
            let log_len = state.log.len();
            return Err(Box::new(ExplorationFailure::new(
                ExplorationError::Overflow {
                    limit: max_log_entries,
                    log_len,
                },
                state,
            )));
        }
    }
    tracing::debug!(entries = state.log.len(), "all queues drained");
    Ok(state)
}
