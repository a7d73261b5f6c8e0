//! Minimum-churn bound for the task scheduler.
//!
//! When capacity changes, the scheduler may move peers between tasks, but
//! never more than the provable minimum. The bound separates two sources of
//! movement:
//!
//! ```text
//!   old ──(forced departures)──> mid ──(rebalancing)──> new
//! ```
//!
//! `mid` is `old` with the peers this entry directly removes (a departing
//! peer, or every peer of a departing group) taken off their tasks. Per task
//! the expected churn is `(old - mid) + |mid - new|`: what left by force plus
//! the smallest number of moves that turns `mid` into `new`. Summing across
//! tasks gives `n_expected`; the observed churn
//! `|newly allocated| + |deallocated|` must not exceed it.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{CommandKind, JobId, LogEntry, PeerId, Replica, TaskId, args};

use super::invariant_trait::TransitionInvariant;

/// An allocation of one peer to one task.
pub type AllocationTriple = (PeerId, JobId, TaskId);

/// Every (peer, job, task) allocation in a replica.
pub fn allocation_triples(replica: &Replica) -> BTreeSet<AllocationTriple> {
    replica
        .allocations()
        .iter()
        .flat_map(|(job, tasks)| {
            tasks.iter().flat_map(move |(task, peers)| {
                peers
                    .iter()
                    .map(move |peer| (peer.clone(), job.clone(), task.clone()))
            })
        })
        .collect()
}

/// Peers this entry removes from their tasks on its own, before the
/// scheduler runs.
///
/// Only departures force peers off: `leave-cluster` removes the peer named
/// under `id`, `group-leave-cluster` removes every peer the group owned in
/// `old`. Every other kind forces nothing out.
pub fn forced_departures(entry: &LogEntry, old: &Replica) -> BTreeSet<PeerId> {
    match entry.kind {
        CommandKind::LeaveCluster => entry.peer_arg(args::ID).cloned().into_iter().collect(),
        CommandKind::GroupLeaveCluster => entry
            .group_arg(args::ID)
            .map(|group| old.peers_of(group))
            .unwrap_or_default(),
        _ => BTreeSet::new(),
    }
}

/// Peer count per (job, task).
fn task_counts<'a>(
    triples: impl IntoIterator<Item = &'a AllocationTriple>,
) -> BTreeMap<(JobId, TaskId), usize> {
    let mut counts = BTreeMap::new();
    for (_, job, task) in triples {
        *counts.entry((job.clone(), task.clone())).or_insert(0) += 1;
    }
    counts
}

/// Expected minimum churn from per-task `(old, mid, new)` peer counts.
pub fn expected_churn(counts: impl IntoIterator<Item = (usize, usize, usize)>) -> usize {
    counts
        .into_iter()
        .map(|(old, mid, new)| old.saturating_sub(mid) + mid.abs_diff(new))
        .sum()
}

/// Observed churn between two allocation sets.
pub fn actual_churn(before: &BTreeSet<AllocationTriple>, after: &BTreeSet<AllocationTriple>) -> usize {
    after.difference(before).count() + before.difference(after).count()
}

/// Why the churn bound does not apply to a transition, if it does not.
pub fn churn_exemption(old: &Replica, new: &Replica) -> Option<&'static str> {
    if old.jobs_with_allocations() != new.jobs_with_allocations() {
        return Some("set of allocated jobs changed");
    }
    let old_jobs: BTreeSet<&JobId> = old.jobs().iter().collect();
    let new_jobs: BTreeSet<&JobId> = new.jobs().iter().collect();
    if old_jobs != new_jobs {
        return Some("job set changed");
    }
    // Tag-constrained placement is solved elsewhere and is not held to the
    // formula. Any job of the new job set counts, allocated or not.
    let tagged = new_jobs.iter().any(|job| {
        new.required_tags()
            .get(*job)
            .is_some_and(|tags| !tags.is_empty())
    });
    if tagged {
        return Some("job with required tags");
    }
    None
}

/// Expected minimum churn for the transition `old -> new` caused by `entry`.
pub fn expected_transition_churn(old: &Replica, new: &Replica, entry: &LogEntry) -> usize {
    let forced = forced_departures(entry, old);
    let before = allocation_triples(old);
    let after = allocation_triples(new);

    let old_counts = task_counts(&before);
    let mid_counts = task_counts(before.iter().filter(|(peer, _, _)| !forced.contains(peer)));
    let new_counts = task_counts(&after);

    let tasks: BTreeSet<&(JobId, TaskId)> = old_counts
        .keys()
        .chain(mid_counts.keys())
        .chain(new_counts.keys())
        .collect();

    expected_churn(tasks.into_iter().map(|key| {
        (
            old_counts.get(key).copied().unwrap_or(0),
            mid_counts.get(key).copied().unwrap_or(0),
            new_counts.get(key).copied().unwrap_or(0),
        )
    }))
}

/// The scheduler never moves more peers than the minimum the transition
/// requires.
pub struct MinimumChurn;

impl TransitionInvariant for MinimumChurn {
    fn name(&self) -> &str {
        "minimum_churn"
    }

    fn check(&self, old: &Replica, new: &Replica, entry: &LogEntry) -> Result<(), String> {
        if let Some(reason) = churn_exemption(old, new) {
            tracing::trace!(kind = %entry.kind, reason, "churn bound skipped");
            return Ok(());
        }

        let n_actual = actual_churn(&allocation_triples(old), &allocation_triples(new));
        let n_expected = expected_transition_churn(old, new, entry);

        if n_actual > n_expected {
            return Err(format!(
                "scheduler moved {n_actual} allocations, minimum is {n_expected}"
            ));
        }
        Ok(())
    }
}
