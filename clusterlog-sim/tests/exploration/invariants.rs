//! Transition invariants catching faulty models.

use clusterlog_sim::invariants::{actual_churn, allocation_triples, expected_transition_churn};
use clusterlog_sim::simulations::cluster::ReferenceCluster;
use clusterlog_sim::{
    CommandKind, ErrorKind, IndexChoice, InvariantChecker, MessageId, TransitionEngine, drive,
    invariant_fn,
};

use super::common::{FlipScheduler, engine, flip_state, init_logging, join_state};

fn flip_engine() -> TransitionEngine<ReferenceCluster<FlipScheduler>> {
    TransitionEngine::new(ReferenceCluster::with_scheduler(FlipScheduler))
}

#[test]
fn test_flip_scheduler_violates_minimum_churn() {
    init_logging();
    let failure = drive(
        flip_state(3, MessageId::new(0)),
        &flip_engine(),
        &mut IndexChoice::new([]),
        1000,
    )
    .expect_err("third peer triggers a needless swap");

    assert_eq!(
        failure.error.kind(),
        ErrorKind::InvariantViolation("minimum_churn".to_string())
    );

    let violation = failure.error.violation().expect("violation details");
    assert_eq!(violation.entry.kind, CommandKind::AddVirtualPeer);
    assert_eq!(violation.entry.message_id, Some(MessageId::new(3)));
    assert_eq!(violation.old.version(), Some(MessageId::new(2)));
    assert_eq!(violation.new.version(), Some(MessageId::new(3)));

    let actual = actual_churn(
        &allocation_triples(&violation.old),
        &allocation_triples(&violation.new),
    );
    let expected = expected_transition_churn(&violation.old, &violation.new, &violation.entry);
    assert!(actual > expected, "actual {actual} <= expected {expected}");

    // The failing entry is not part of the committed log.
    assert_eq!(failure.state.log.len(), 3);
    assert_eq!(failure.timeline().len(), 4);
}

#[test]
fn test_swap_while_job_is_first_placed_is_exempt() {
    init_logging();
    let done = drive(
        flip_state(2, MessageId::new(0)),
        &flip_engine(),
        &mut IndexChoice::new([]),
        1000,
    )
    .expect("placing a job for the first time is exempt");
    assert_eq!(done.log.len(), 3);
}

#[test]
fn test_without_invariants_the_flip_goes_unnoticed() {
    let engine = TransitionEngine::with_checker(
        ReferenceCluster::with_scheduler(FlipScheduler),
        InvariantChecker::empty(),
    );
    let done = drive(
        flip_state(3, MessageId::new(0)),
        &engine,
        &mut IndexChoice::new([]),
        1000,
    )
    .expect("nothing checks churn");
    assert_eq!(done.log.len(), 4);
}

#[test]
fn test_custom_invariant_stops_run() {
    init_logging();
    let checker = InvariantChecker::standard().with_boxed(invariant_fn(
        "single_group",
        |_old, new, _entry| {
            if new.groups().len() > 1 {
                return Err(format!("{} groups joined", new.groups().len()));
            }
            Ok(())
        },
    ));
    let engine = TransitionEngine::with_checker(ReferenceCluster::new(), checker);

    let failure = drive(join_state(2, 0), &engine, &mut IndexChoice::new([]), 1000)
        .expect_err("second group joins");

    assert_eq!(
        failure.error.kind(),
        ErrorKind::InvariantViolation("single_group".to_string())
    );
    let violation = failure.error.violation().expect("violation details");
    assert_eq!(violation.entry.kind, CommandKind::NotifyJoinCluster);
    assert_eq!(violation.message, "2 groups joined");
    assert_eq!(failure.state.log.len(), 3);
}

#[test]
fn test_version_tracks_message_id() {
    let checker = InvariantChecker::standard().with_boxed(invariant_fn(
        "version_advances",
        |_old, new, entry| {
            if new.version() != entry.message_id {
                return Err(format!(
                    "version {:?} != {:?}",
                    new.version(),
                    entry.message_id
                ));
            }
            Ok(())
        },
    ));
    let checked = TransitionEngine::with_checker(ReferenceCluster::new(), checker);
    drive(join_state(2, 2), &checked, &mut IndexChoice::new([1, 0, 2, 1]), 1000)
        .expect("every version matches its entry");

    // The reference model under the standard checker is the baseline.
    drive(join_state(2, 2), &engine(), &mut IndexChoice::new([]), 1000)
        .expect("reference run is clean");
}
