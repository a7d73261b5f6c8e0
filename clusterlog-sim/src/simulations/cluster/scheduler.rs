//! Task placement for the reference cluster.
//!
//! [`BalancedScheduler`] spreads joined peers evenly over the tasks of the
//! live jobs and only ever moves the peers it has to: a task above its target
//! gives up its most recent peers, a task below it takes idle ones. Peers that
//! stay on their task keep their slot.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{JobId, PeerId, Replica, TaskId};

/// Decides where peers run after each membership or job change.
pub trait Scheduler {
    /// Rewrite the allocations of `replica` in place.
    fn reallocate(&self, replica: &mut Replica);
}

/// Even spread with minimum movement.
#[derive(Debug, Default, Clone, Copy)]
pub struct BalancedScheduler;

/// Target peer count per task, in placement order.
///
/// Jobs are admitted in submission order while the remaining peers cover
/// the sum of their tasks' minimums; leftover peers are dealt round-robin
/// over the admitted tasks. Killed jobs get nothing.
pub fn task_targets(replica: &Replica) -> Vec<((JobId, TaskId), usize)> {
    let mut remaining = replica.peers().len();
    let mut targets: Vec<((JobId, TaskId), usize)> = Vec::new();

    for job in replica.jobs() {
        if replica.killed_jobs().contains(job) {
            continue;
        }
        let tasks = replica.tasks(job);
        if tasks.is_empty() {
            continue;
        }
        let needed: usize = tasks
            .iter()
            .map(|task| replica.min_required_peers(job, task))
            .sum();
        if needed > remaining {
            tracing::trace!(%job, needed, remaining, "job not placed");
            continue;
        }
        remaining -= needed;
        for task in tasks {
            let min = replica.min_required_peers(job, task);
            targets.push(((job.clone(), task.clone()), min));
        }
    }

    if !targets.is_empty() {
        let count = targets.len();
        for i in 0..remaining {
            targets[i % count].1 += 1;
        }
    }
    targets
}

fn eligible(replica: &Replica, peer: &PeerId, required: &BTreeSet<String>) -> bool {
    required.is_empty() || replica.peer_tags(peer).is_superset(required)
}

impl Scheduler for BalancedScheduler {
    fn reallocate(&self, replica: &mut Replica) {
        let targets = task_targets(replica);
        let wanted: BTreeMap<(JobId, TaskId), usize> = targets.iter().cloned().collect();

        let mut released = Vec::new();
        for (job, tasks) in replica.allocations() {
            for (task, peers) in tasks {
                let keep = wanted
                    .get(&(job.clone(), task.clone()))
                    .copied()
                    .unwrap_or(0);
                released.extend(peers.iter().skip(keep).cloned());
            }
        }
        for peer in &released {
            replica.deallocate(peer);
        }

        let mut idle: BTreeSet<PeerId> = replica
            .peers()
            .iter()
            .filter(|peer| replica.allocated_task(peer).is_none())
            .cloned()
            .collect();

        for ((job, task), want) in &targets {
            let required = replica.job_required_tags(job);
            let have = replica.task_allocation(job, task).len();
            for _ in have..*want {
                let Some(peer) = idle
                    .iter()
                    .find(|peer| eligible(replica, peer, &required))
                    .cloned()
                else {
                    break;
                };
                idle.remove(&peer);
                replica.allocate(job, task, &peer);
            }
        }

        tracing::trace!(
            released = released.len(),
            idle = idle.len(),
            "reallocation done"
        );
    }
}
