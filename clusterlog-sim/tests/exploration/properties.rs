//! Randomized runs of the reference cluster: whatever the interleaving, the
//! join protocol completes and the invariants hold.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use clusterlog_sim::simulations::cluster::{ClusterDiff, workload};
use clusterlog_sim::{
    ActorId, ExplorationState, GroupId, GroupLayout, JobId, LogEntry, MessageId, PeerId,
    RandomChoice, drive, join_seed, merge_queues, set_sim_seed,
};

use super::common::{engine, fixed_layout, init_logging};

fn peer_count(state: &ExplorationState<ClusterDiff>) -> usize {
    state
        .queues
        .keys()
        .filter(|actor| matches!(actor, ActorId::Peer(_)))
        .count()
}

fn group_count(state: &ExplorationState<ClusterDiff>) -> usize {
    state
        .queues
        .keys()
        .filter(|actor| matches!(actor, ActorId::Group(g) if g.as_str() != "client"))
        .count()
}

/// `(tasks, min peers per task)` for each submitted job.
fn jobs_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((1usize..3, 1usize..3), 0..4)
}

fn client_entries(jobs: &[(usize, usize)], kill_first: bool) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    for (j, (tasks, min)) in jobs.iter().enumerate() {
        let names: Vec<String> = (0..*tasks).map(|t| format!("t{t}")).collect();
        let specs: Vec<(&str, usize)> = names.iter().map(|n| (n.as_str(), *min)).collect();
        entries.push(workload::submit_job(&format!("job{j}"), &specs, &[]));
    }
    if kill_first && !jobs.is_empty() {
        entries.push(workload::kill_job("job0"));
    }
    entries.push(workload::gc());
    entries
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_cluster_settles(
        seed in any::<u64>(),
        jobs in jobs_strategy(),
        kill_first in any::<bool>(),
    ) {
        init_logging();
        set_sim_seed(seed);

        let mut state: ExplorationState<ClusterDiff> = join_seed(
            &GroupLayout::Random { groups: 1..5, peers_per_group: 1..4 },
            &BTreeMap::new(),
            MessageId::new(0),
        )
        .unwrap_or_else(|e| panic!("seed state: {e}"));
        let groups = group_count(&state);
        let peers = peer_count(&state);

        prop_assert!(workload::add_peer_departure(&mut state.queues, &PeerId::new("g1-p1")));
        let client = workload::client_queue(client_entries(&jobs, kill_first));
        state.queues = merge_queues([std::mem::take(&mut state.queues), client])
            .unwrap_or_else(|e| panic!("merge: {e}"));

        let done = drive(state, &engine(), &mut RandomChoice, 1000)
            .unwrap_or_else(|f| panic!("seed {seed}: {f}"));

        prop_assert!(done.log.len() <= 1000);
        prop_assert_eq!(done.replica.groups().len(), groups);
        prop_assert_eq!(done.replica.peers().len(), peers - 1);
        prop_assert!(!done.replica.is_joined_peer(&PeerId::new("g1-p1")));
        prop_assert!(done.replica.prepared().is_empty());
        prop_assert!(done.replica.accepted().is_empty());
        prop_assert!(done.replica.check_indexes().is_ok());
    }

    #[test]
    fn group_departure_leaves_the_rest_intact(seed in any::<u64>()) {
        init_logging();
        set_sim_seed(seed);

        let mut state: ExplorationState<ClusterDiff> =
            join_seed(&fixed_layout(3, 2), &BTreeMap::new(), MessageId::new(0))
                .unwrap_or_else(|e| panic!("seed state: {e}"));
        prop_assert!(workload::add_group_departure(
            &mut state.queues,
            &GroupId::new("g2"),
            &PeerId::new("g2-p1"),
            3,
            2,
        ));
        let client = workload::client_queue([workload::submit_job(
            "etl",
            &[("extract", 1), ("load", 1)],
            &[],
        )]);
        state.queues = merge_queues([std::mem::take(&mut state.queues), client])
            .unwrap_or_else(|e| panic!("merge: {e}"));

        let done = drive(state, &engine(), &mut RandomChoice, 1000)
            .unwrap_or_else(|f| panic!("seed {seed}: {f}"));

        prop_assert_eq!(
            done.replica.groups(),
            &BTreeSet::from([GroupId::new("g1"), GroupId::new("g3")])
        );
        prop_assert_eq!(done.replica.peers().len(), 4);
        prop_assert!(done.replica.peers_of(&GroupId::new("g2")).is_empty());
        prop_assert_eq!(
            done.replica.jobs_with_allocations(),
            BTreeSet::from([JobId::new("etl")])
        );
    }
}
