//! Multi-seed runs, failure reports and shrinking.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use clusterlog_sim::simulations::cluster::{ReferenceCluster, workload};
use clusterlog_sim::{
    ActorId, ActorQueue, CommandKind, ErrorKind, ExplorationBuilder, ExplorationConfig,
    GroupLayout, LogEntry, MessageId, TransitionEngine, get_current_sim_seed, get_rng_call_count,
    join_seed, merge_queues, parse_timeline, shrink_choices, sim_random,
};

use super::common::{FlipScheduler, engine, flip_state, init_logging};

fn flip_builder() -> ExplorationBuilder<ReferenceCluster<FlipScheduler>> {
    ExplorationBuilder::new(TransitionEngine::new(ReferenceCluster::with_scheduler(
        FlipScheduler,
    )))
    .seed(|initial| Ok(flip_state(3, initial)))
}

#[test]
fn test_faulty_scheduler_fails_every_seed() {
    init_logging();
    let report = flip_builder().set_iterations(4).set_base_seed(3).run();

    assert_eq!(report.iterations, 4);
    assert_eq!(report.failed_runs, 4);
    assert_eq!(report.successful_runs, 0);
    assert!(!report.is_success());
    assert_eq!(report.seeds_failing, report.seeds_used);

    for failure in &report.failures {
        assert_eq!(
            failure.error.kind(),
            ErrorKind::InvariantViolation("minimum_churn".to_string())
        );
        let timeline = parse_timeline(&failure.timeline).expect("timeline parses");
        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline[0], ActorId::group("g1"));
    }

    let first = &report.failures[0];
    let shrunk = first.shrunk_timeline.as_deref().expect("first failure shrunk");
    assert_eq!(parse_timeline(shrunk).expect("shrunk timeline parses").len(), 4);
    let indices = first.shrunk_indices.as_ref().expect("shrunk indices");
    assert!(indices.len() <= 4);

    let log: serde_json::Value =
        serde_json::from_str(first.log_json.as_deref().expect("log recorded")).expect("json");
    assert_eq!(log.as_array().map(Vec::len), Some(3));

    // Only the first failure is shrunk.
    assert!(report.failures[1].shrunk_timeline.is_none());

    let text = report.to_string();
    assert!(text.contains("=== Exploration Report ==="));
    assert!(text.contains("Shrunk timeline:"));
}

#[test]
fn test_shrinking_can_be_disabled() {
    let report = flip_builder().set_iterations(1).shrink(false).run();
    assert_eq!(report.failed_runs, 1);
    assert!(report.failures[0].shrunk_timeline.is_none());
    assert!(report.failures[0].shrunk_indices.is_none());
}

#[test]
fn test_shrink_choices_keeps_failure_kind() {
    init_logging();
    let target = ErrorKind::InvariantViolation("minimum_churn".to_string());
    let engine = TransitionEngine::new(ReferenceCluster::with_scheduler(FlipScheduler));
    let outcome = shrink_choices(
        &engine,
        || Ok(flip_state(3, MessageId::new(0))),
        &[0, 2, 1, 0, 5],
        &target,
        1000,
        100,
    )
    .expect("sequence reproduces");

    assert_eq!(outcome.failure.error.kind(), target);
    assert!(outcome.indices.len() <= 5);
    assert!(outcome.attempts <= 100);
    assert!(outcome.indices.iter().all(|i| *i == 0));
}

#[test]
fn test_shrink_choices_rejects_passing_sequence() {
    let target = ErrorKind::InvariantViolation("minimum_churn".to_string());
    let outcome = shrink_choices(
        &engine(),
        || Ok(flip_state(3, MessageId::new(0))),
        &[0, 0, 0, 0],
        &target,
        1000,
        100,
    );
    assert!(outcome.is_none(), "the balanced scheduler never fails");
}

#[test]
fn test_reference_cluster_passes_every_seed() {
    init_logging();
    let report = ExplorationBuilder::new(engine())
        .seed(|initial| {
            let mut state = join_seed(
                &GroupLayout::Random {
                    groups: 1..4,
                    peers_per_group: 1..4,
                },
                &BTreeMap::new(),
                initial,
            )?;
            let client = workload::client_queue([
                workload::submit_job("etl", &[("extract", 1), ("load", 1)], &[]),
                workload::submit_job("report", &[("render", 1)], &[]),
                workload::kill_job("etl"),
                workload::gc(),
            ]);
            state.queues = merge_queues([std::mem::take(&mut state.queues), client])?;
            Ok(state)
        })
        .set_iterations(10)
        .set_base_seed(42)
        .run();

    assert!(report.is_success(), "{report}");
    assert_eq!(report.successful_runs, 10);
    assert_eq!(report.seeds_used.len(), 10);
    assert!(report.average_log_len() >= 5.0);
    assert!((report.success_rate() - 100.0).abs() < f64::EPSILON);
}

#[test]
fn test_debug_seeds_come_first() {
    let report = ExplorationBuilder::new(engine())
        .seed(|initial| {
            join_seed(
                &GroupLayout::Fixed {
                    groups: 2,
                    peers_per_group: 1,
                },
                &BTreeMap::new(),
                initial,
            )
        })
        .set_debug_seeds(vec![11, 13])
        .set_iterations(3)
        .set_base_seed(5)
        .run();

    assert_eq!(report.iterations, 3);
    assert_eq!(&report.seeds_used[..2], &[11, 13]);
    assert!(report.is_success());
}

#[test]
fn test_every_iteration_starts_from_a_freshly_seeded_rng() {
    init_logging();
    let draws = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&draws);
    let report = ExplorationBuilder::new(engine())
        .seed(move |initial| {
            sink.borrow_mut().push((
                get_current_sim_seed(),
                get_rng_call_count(),
                sim_random::<u64>(),
            ));
            join_seed(
                &GroupLayout::Random {
                    groups: 1..4,
                    peers_per_group: 1..3,
                },
                &BTreeMap::new(),
                initial,
            )
        })
        .set_debug_seeds(vec![9, 9, 4])
        .set_iterations(3)
        .run();
    assert!(report.is_success(), "{report}");

    let draws = draws.borrow();
    assert_eq!(draws.len(), 3);
    assert!(draws.iter().all(|(_, calls, _)| *calls == 0));
    assert_eq!(draws[0].0, 9);
    // The first run drew from the RNG; the repeat must not see its leftovers.
    assert_eq!(draws[0], draws[1]);
    assert_eq!(draws[2].0, 4);
    assert_ne!(draws[2].2, draws[0].2);
}

#[test]
fn test_config_sets_initial_message_id() {
    let config = ExplorationConfig {
        iterations: 1,
        initial_message_id: 500,
        shrink: false,
        ..ExplorationConfig::default()
    };
    let report = flip_builder().config(config).run();

    let log = report.failures[0].log_json.as_deref().expect("log recorded");
    let rows: serde_json::Value = serde_json::from_str(log).expect("json");
    assert_eq!(rows[0]["entry"]["message_id"], serde_json::json!(500));
    assert_eq!(rows[2]["entry"]["message_id"], serde_json::json!(502));
}

#[test]
fn test_duplicate_seed_actor_is_reported() {
    let report = ExplorationBuilder::new(engine())
        .seed(|initial| {
            let mut state = join_seed(
                &GroupLayout::Fixed {
                    groups: 1,
                    peers_per_group: 0,
                },
                &BTreeMap::new(),
                initial,
            )?;
            let again = BTreeMap::from([(
                ActorId::group("g1"),
                ActorQueue::from_entries([LogEntry::new(CommandKind::Gc)]),
            )]);
            state.queues = merge_queues([std::mem::take(&mut state.queues), again])?;
            Ok(state)
        })
        .set_iterations(2)
        .run();

    assert_eq!(report.failed_runs, 2);
    assert_eq!(report.failures[0].error.kind(), ErrorKind::DuplicateActor);
    assert!(report.failures[0].timeline.is_empty());
}

#[test]
fn test_no_seed_factory_runs_nothing() {
    let report = ExplorationBuilder::new(engine()).set_iterations(5).run();
    assert_eq!(report.iterations, 0);
    assert!(report.is_success());
}
