//! Deterministic transition function of the reference cluster.
//!
//! Join protocol:
//!
//! ```text
//!   joiner: prepare-join-cluster {joiner}
//!       no group joined yet  -> joiner admitted directly
//!       otherwise            -> observer picked, prepared[joiner] = observer
//!   observer: accept-join-cluster {accepted-observer, accepted-joiner}
//!       prepared -> accepted
//!   observer: notify-join-cluster {observer, joiner}
//!       accepted -> joiner admitted
//!   any group: abort-join-cluster {id}
//!       bookkeeping for id dropped; the joiner prepares again
//! ```
//!
//! Every command that changes peers or jobs hands the replica to the
//! scheduler afterwards.

use std::collections::BTreeSet;

use crate::model::{CommandKind, GroupId, LogEntry, Replica, args};

use super::scheduler::Scheduler;

/// The joined group observing the fewest in-flight joins, lowest id first.
pub fn pick_observer(replica: &Replica) -> Option<GroupId> {
    replica
        .groups()
        .iter()
        .min_by_key(|group| {
            let load = replica
                .prepared()
                .values()
                .chain(replica.accepted().values())
                .filter(|observer| observer == group)
                .count();
            (load, (*group).clone())
        })
        .cloned()
}

fn prepare_join(entry: &LogEntry, replica: &mut Replica) {
    let Some(joiner) = entry.group_arg(args::JOINER) else {
        return;
    };
    if replica.is_joined_group(joiner) || replica.join_pending(joiner) {
        return;
    }
    match pick_observer(replica) {
        Some(observer) => replica.prepare_join(joiner.clone(), observer),
        None => replica.add_group(joiner.clone()),
    }
}

fn accept_join(entry: &LogEntry, replica: &mut Replica) {
    let (Some(observer), Some(joiner)) = (
        entry.group_arg(args::ACCEPTED_OBSERVER),
        entry.group_arg(args::ACCEPTED_JOINER),
    ) else {
        return;
    };
    if replica.prepared().get(joiner) == Some(observer) && replica.is_joined_group(observer) {
        replica.accept_join(joiner.clone(), observer.clone());
    }
}

fn notify_join(entry: &LogEntry, replica: &mut Replica) {
    let (Some(observer), Some(joiner)) = (
        entry.group_arg(args::OBSERVER),
        entry.group_arg(args::JOINER),
    ) else {
        return;
    };
    if replica.accepted().get(joiner) == Some(observer) {
        replica.clear_join(joiner);
        replica.add_group(joiner.clone());
    }
}

/// Apply `entry` to `replica`.
pub fn apply_entry<S: Scheduler + ?Sized>(
    scheduler: &S,
    entry: &LogEntry,
    mut replica: Replica,
) -> Replica {
    let reschedule = match entry.kind {
        CommandKind::PrepareJoinCluster => {
            prepare_join(entry, &mut replica);
            false
        }
        CommandKind::AcceptJoinCluster => {
            accept_join(entry, &mut replica);
            false
        }
        CommandKind::NotifyJoinCluster => {
            notify_join(entry, &mut replica);
            false
        }
        CommandKind::AbortJoinCluster => {
            if let Some(joiner) = entry.group_arg(args::ID) {
                replica.clear_join(joiner);
            }
            false
        }
        CommandKind::AddVirtualPeer => match (
            entry.peer_arg(args::ID),
            entry.group_arg(args::GROUP_ID),
        ) {
            (Some(peer), Some(group))
                if replica.is_joined_group(group) && !replica.is_joined_peer(peer) =>
            {
                let tags = entry.tags_arg(args::TAGS).cloned().unwrap_or_default();
                replica.add_peer(peer.clone(), group.clone(), tags);
                true
            }
            _ => false,
        },
        CommandKind::LeaveCluster => match entry.peer_arg(args::ID) {
            Some(peer) if replica.is_joined_peer(peer) => {
                replica.remove_peer(peer);
                true
            }
            _ => false,
        },
        CommandKind::GroupLeaveCluster => match entry.group_arg(args::ID) {
            Some(group) if replica.is_joined_group(group) => {
                replica.remove_group(group);
                true
            }
            _ => false,
        },
        CommandKind::SubmitJob => match entry.job_arg(args::JOB_ID) {
            Some(job) => {
                let tasks = entry.tasks_arg().unwrap_or(&[]);
                let tags: BTreeSet<String> = entry
                    .tags_arg(args::REQUIRED_TAGS)
                    .cloned()
                    .unwrap_or_default();
                replica.add_job(job.clone(), tasks, tags);
                true
            }
            None => false,
        },
        CommandKind::KillJob => match entry.job_arg(args::JOB_ID) {
            Some(job) => {
                replica.kill_job(job);
                true
            }
            None => false,
        },
        CommandKind::Gc => {
            replica.gc();
            false
        }
        CommandKind::SignalReady => false,
    };

    if reschedule {
        scheduler.reallocate(&mut replica);
    }
    replica
}
