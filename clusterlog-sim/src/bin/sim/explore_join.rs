//! Binary target for join-protocol exploration.
//!
//! Runs the reference cluster over random group layouts with a job client
//! and one peer departure, and prints the exploration report.

use std::collections::BTreeMap;
use std::process;

use clusterlog_sim::simulations::cluster::{ReferenceCluster, workload};
use clusterlog_sim::{
    ExplorationBuilder, GroupLayout, MessageId, PeerId, TransitionEngine, join_seed,
    merge_queues,
};

fn main() {
    tracing_subscriber::fmt::init();

    let report = ExplorationBuilder::new(TransitionEngine::new(ReferenceCluster::new()))
        .seed(|initial: MessageId| {
            let mut state = join_seed(
                &GroupLayout::Random {
                    groups: 1..5,
                    peers_per_group: 1..4,
                },
                &BTreeMap::new(),
                initial,
            )?;
            workload::add_peer_departure(&mut state.queues, &PeerId::new("g1-p1"));
            let client = workload::client_queue([
                workload::submit_job("etl", &[("extract", 1), ("load", 1)], &[]),
                workload::submit_job("report", &[("render", 1)], &[]),
                workload::kill_job("report"),
                workload::gc(),
            ]);
            state.queues = merge_queues([std::mem::take(&mut state.queues), client])?;
            Ok(state)
        })
        .set_iterations(25)
        .run();

    eprintln!("{report}");

    if !report.is_success() {
        for failure in &report.failures {
            if let Some(ref log) = failure.log_json {
                eprintln!("Log of seed {}:\n{log}", failure.seed);
            }
        }
        process::exit(1);
    }
}
