//! Shared fixtures.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use clusterlog_sim::simulations::cluster::{
    BalancedScheduler, ClusterDiff, ReferenceCluster, Scheduler,
};
use clusterlog_sim::{
    ExplorationState, GroupLayout, MessageId, Replica, TaskSpec, TransitionEngine, join_seed,
};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

pub fn engine() -> TransitionEngine<ReferenceCluster> {
    TransitionEngine::new(ReferenceCluster::new())
}

pub fn fixed_layout(groups: usize, peers_per_group: usize) -> GroupLayout {
    GroupLayout::Fixed {
        groups,
        peers_per_group,
    }
}

pub fn join_state(groups: usize, peers_per_group: usize) -> ExplorationState<ClusterDiff> {
    join_seed(
        &fixed_layout(groups, peers_per_group),
        &BTreeMap::new(),
        MessageId::new(0),
    )
    .expect("join seed")
}

/// A replica that already knows job `j` with tasks `a` and `b`.
pub fn replica_with_job() -> Replica {
    let mut replica = Replica::new();
    replica.add_job(
        "j".into(),
        &[
            TaskSpec {
                id: "a".into(),
                min_peers: 1,
            },
            TaskSpec {
                id: "b".into(),
                min_peers: 1,
            },
        ],
        BTreeSet::new(),
    );
    replica
}

/// Balanced placement, then the first peers of the first two allocated
/// tasks trade places. Every rebalance with two populated tasks moves more
/// than it has to.
pub struct FlipScheduler;

impl Scheduler for FlipScheduler {
    fn reallocate(&self, replica: &mut Replica) {
        BalancedScheduler.reallocate(replica);

        let heads: Vec<_> = replica
            .allocations()
            .iter()
            .flat_map(|(job, tasks)| {
                tasks
                    .iter()
                    .filter_map(move |(task, peers)| {
                        peers.first().map(|p| (job.clone(), task.clone(), p.clone()))
                    })
            })
            .take(2)
            .collect();

        if let [(job_a, task_a, peer_a), (job_b, task_b, peer_b)] = heads.as_slice() {
            replica.allocate(job_b, task_b, peer_a);
            replica.allocate(job_a, task_a, peer_b);
        }
    }
}

/// The preloaded job plus join queues for one group of `peers` peers.
pub fn flip_state(peers: usize, initial: MessageId) -> ExplorationState<ClusterDiff> {
    let seed: ExplorationState<ClusterDiff> =
        join_seed(&fixed_layout(1, peers), &BTreeMap::new(), initial).expect("join seed");
    ExplorationState::new(replica_with_job(), seed.queues, initial)
}
