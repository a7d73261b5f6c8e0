//! Driver behavior: selection, ordering, termination and replay.

use std::collections::BTreeMap;

use clusterlog_sim::simulations::cluster::{ClusterDiff, ReferenceCluster};
use clusterlog_sim::{
    ActorId, ActorQueue, ActorState, ArgValue, ClusterModel, CommandKind, ErrorKind,
    ExhaustiveLimits, ExplorationError, ExplorationState, GroupId, IndexChoice, LogEntry,
    MessageId, PeerId, RandomChoice, Replica, TransitionEngine, args, drive, explore_exhaustive,
    format_timeline, parse_timeline, replay_timeline, select_candidates, set_sim_seed,
};

use super::common::{FlipScheduler, engine, flip_state, init_logging, join_state};

#[test]
fn test_example_single_group_single_peer() {
    init_logging();
    let state = join_state(1, 1);

    assert_eq!(
        select_candidates(&state),
        vec![ActorId::group("g1")],
        "g1-p1 must wait for g1 to join"
    );

    set_sim_seed(1);
    let done = drive(state, &engine(), &mut RandomChoice, 1000).expect("run completes");

    let first = &done.log[0].entry;
    assert_eq!(first.kind, CommandKind::PrepareJoinCluster);
    assert_eq!(first.group_arg(args::JOINER), Some(&GroupId::new("g1")));
    assert_eq!(first.message_id, Some(MessageId::new(0)));

    assert_eq!(done.log.len(), 2);
    assert!(done.replica.is_joined_group(&GroupId::new("g1")));
    assert!(done.replica.is_joined_peer(&PeerId::new("g1-p1")));
    assert_eq!(
        done.choices,
        vec![ActorId::group("g1"), ActorId::peer("g1-p1")]
    );
}

#[test]
fn test_message_ids_increase_by_one_from_initial() {
    init_logging();
    let seed: ExplorationState<_> = join_state(3, 2);
    let state = ExplorationState::new(Replica::new(), seed.queues, MessageId::new(100));

    set_sim_seed(7);
    let done = drive(state, &engine(), &mut RandomChoice, 1000).expect("run completes");

    for (offset, committed) in done.log.iter().enumerate() {
        assert_eq!(
            committed.entry.message_id,
            Some(MessageId::new(100 + offset as u64)),
            "entry {offset} has the wrong id"
        );
    }
    assert_eq!(done.replica.version(), Some(MessageId::new(100 + done.log.len() as u64 - 1)));
}

#[test]
fn test_join_protocol_admits_every_group_and_peer() {
    init_logging();
    for seed in 0..20 {
        set_sim_seed(seed);
        let done = drive(join_state(3, 2), &engine(), &mut RandomChoice, 1000)
            .unwrap_or_else(|f| panic!("seed {seed} failed: {f}"));

        assert_eq!(done.replica.groups().len(), 3, "seed {seed}");
        assert_eq!(done.replica.peers().len(), 6, "seed {seed}");
        assert!(done.replica.prepared().is_empty(), "seed {seed}");
        assert!(done.replica.accepted().is_empty(), "seed {seed}");
        // 3 prepares, 2 accepts, 2 notifies, 6 peer registrations
        assert_eq!(done.log.len(), 13, "seed {seed}");
    }
}

/// `g1` joins; `g2-p1` waits on `g2`, which has nothing to write.
fn orphan_peer_state() -> ExplorationState<ClusterDiff> {
    let mut queues = join_state(1, 0).queues;
    let orphan = LogEntry::new(CommandKind::AddVirtualPeer)
        .with_arg(args::ID, ArgValue::Peer("g2-p1".into()))
        .with_arg(args::GROUP_ID, ArgValue::Group("g2".into()));
    queues.insert(
        ActorId::peer("g2-p1"),
        ActorQueue::from_entries([orphan])
            .with_predicate(|replica, _| replica.is_joined_group(&GroupId::new("g2"))),
    );
    ExplorationState::new(Replica::new(), queues, MessageId::new(0))
}

#[test]
fn test_deadlock_when_owner_group_never_joins() {
    init_logging();
    let state = orphan_peer_state();

    let failure = drive(state, &engine(), &mut IndexChoice::new([]), 1000)
        .expect_err("g2 never joins");
    match &failure.error {
        ExplorationError::Deadlock { pending, log_len } => {
            assert_eq!(pending, &vec![ActorId::peer("g2-p1")]);
            assert_eq!(*log_len, 1);
        }
        other => panic!("expected deadlock, got {other}"),
    }
    assert_eq!(failure.state.log.len(), 1);
}

#[test]
fn test_non_members_only_write_their_own_admission() {
    let mut replica = Replica::new();
    replica.add_group("g1".into());
    replica.add_group("g3".into());

    let leave = LogEntry::new(CommandKind::LeaveCluster)
        .with_arg(args::ID, ArgValue::Peer("gx-p1".into()));
    let submit = LogEntry::new(CommandKind::SubmitJob)
        .with_arg(args::JOB_ID, ArgValue::Job("j".into()));
    let own_prepare = LogEntry::new(CommandKind::PrepareJoinCluster)
        .with_arg(args::JOINER, ArgValue::Group("gz".into()));
    let foreign_prepare = LogEntry::new(CommandKind::PrepareJoinCluster)
        .with_arg(args::JOINER, ArgValue::Group("gz".into()));

    let queues = BTreeMap::from([
        (ActorId::group("client"), ActorQueue::from_entries([submit])),
        (
            ActorId::group("g1"),
            ActorQueue::from_entries([LogEntry::new(CommandKind::Gc)
                .with_arg(args::ID, ArgValue::Group("g1".into()))])
            .with_predicate(|_, _| true),
        ),
        (
            ActorId::group("g3"),
            ActorQueue::from_entries([LogEntry::new(CommandKind::SignalReady)])
                .with_predicate(|_, _| false),
        ),
        (
            ActorId::group("gw"),
            ActorQueue::from_entries([foreign_prepare]),
        ),
        (ActorId::group("gx"), ActorQueue::from_entries([leave])),
        (ActorId::group("gz"), ActorQueue::from_entries([own_prepare])),
        (
            ActorId::peer("gy-p1"),
            ActorQueue::from_entries([LogEntry::new(CommandKind::SignalReady)]),
        ),
        (
            ActorId::peer("g1-p9"),
            ActorQueue::from_entries([LogEntry::new(CommandKind::SignalReady)])
                .with_predicate(|_, _| false),
        ),
    ]);
    let state: ExplorationState<()> = ExplorationState::new(replica, queues, MessageId::new(0));

    assert_eq!(
        select_candidates(&state),
        vec![
            ActorId::group("client"),
            ActorId::group("g1"),
            ActorId::group("g3"),
            ActorId::group("gz"),
        ]
    );
}

#[test]
fn test_joined_group_ignores_selection_predicate() {
    init_logging();
    let mut replica = Replica::new();
    replica.add_group("g1".into());
    let queues = BTreeMap::from([(
        ActorId::group("g1"),
        ActorQueue::from_entries([LogEntry::new(CommandKind::SignalReady)])
            .with_predicate(|_, _| false),
    )]);
    let state = ExplorationState::new(replica, queues, MessageId::new(0));

    assert_eq!(select_candidates(&state), vec![ActorId::group("g1")]);

    let done = drive(state, &engine(), &mut IndexChoice::new([]), 1000)
        .expect("a gated member queue is still drained");
    assert_eq!(done.log.len(), 1);
    assert_eq!(done.choices, vec![ActorId::group("g1")]);
}

/// Every joined group answers every entry with another entry.
struct Chatter;

impl ClusterModel for Chatter {
    type Diff = ();

    fn transition(&self, entry: &LogEntry, mut replica: Replica) -> Replica {
        if let Some(joiner) = entry.group_arg(args::JOINER) {
            replica.add_group(joiner.clone());
        }
        replica
    }

    fn replica_diff(&self, _entry: &LogEntry, _old: &Replica, _new: &Replica) {}

    fn reactions(
        &self,
        _entry: &LogEntry,
        _old: &Replica,
        _new: &Replica,
        _diff: &(),
        actor: &ActorState,
    ) -> Vec<LogEntry> {
        match actor.id {
            ActorId::Group(_) => vec![LogEntry::new(CommandKind::SignalReady)],
            ActorId::Peer(_) => Vec::new(),
        }
    }
}

#[test]
fn test_endless_cascade_overflows() {
    init_logging();
    let failure = drive(chatter_seed(), &TransitionEngine::new(Chatter), &mut RandomChoice, 50)
        .expect_err("cascade never settles");
    assert!(matches!(
        failure.error,
        ExplorationError::Overflow {
            limit: 50,
            log_len: 51
        }
    ));
    assert_eq!(failure.error.kind(), ErrorKind::Overflow);
}

fn chatter_seed() -> ExplorationState<()> {
    clusterlog_sim::join_seed(
        &clusterlog_sim::GroupLayout::Fixed {
            groups: 1,
            peers_per_group: 0,
        },
        &BTreeMap::new(),
        MessageId::new(0),
    )
    .expect("join seed")
}

#[test]
fn test_exhaustive_cascade_overflows() {
    init_logging();
    let outcome = explore_exhaustive(
        chatter_seed(),
        &TransitionEngine::new(Chatter),
        ExhaustiveLimits {
            max_log_entries: 20,
            ..ExhaustiveLimits::default()
        },
    );

    let failure = outcome.failure.expect("cascade never settles");
    assert!(matches!(
        failure.error,
        ExplorationError::Overflow {
            limit: 20,
            log_len: 21
        }
    ));
    assert_eq!(failure.state.log.len(), 21);
    assert!(outcome.histories.is_empty());
}

#[test]
fn test_exhaustive_reports_deadlock() {
    init_logging();
    let outcome = explore_exhaustive(orphan_peer_state(), &engine(), ExhaustiveLimits::default());

    let failure = outcome.failure.expect("g2 never joins");
    match &failure.error {
        ExplorationError::Deadlock { pending, log_len } => {
            assert_eq!(pending, &vec![ActorId::peer("g2-p1")]);
            assert_eq!(*log_len, 1);
        }
        other => panic!("expected deadlock, got {other}"),
    }
    assert_eq!(failure.state.log.len(), 1);
    assert!(failure.state.replica.is_joined_group(&GroupId::new("g1")));
    assert_eq!(failure.state.pending(), vec![ActorId::peer("g2-p1")]);
    assert!(outcome.histories.is_empty());
}

#[test]
fn test_exhaustive_two_groups() {
    init_logging();
    let outcome = explore_exhaustive(join_state(2, 0), &engine(), ExhaustiveLimits::default());

    assert!(outcome.failure.is_none());
    assert!(outcome.complete);
    assert_eq!(
        outcome.histories,
        vec![
            vec![
                ActorId::group("g1"),
                ActorId::group("g2"),
                ActorId::group("g1"),
                ActorId::group("g1"),
            ],
            vec![
                ActorId::group("g2"),
                ActorId::group("g1"),
                ActorId::group("g2"),
                ActorId::group("g2"),
            ],
        ]
    );
}

#[test]
fn test_exhaustive_respects_history_bound() {
    let outcome = explore_exhaustive(
        join_state(2, 2),
        &engine(),
        ExhaustiveLimits {
            max_histories: 3,
            ..ExhaustiveLimits::default()
        },
    );
    assert_eq!(outcome.histories.len(), 3);
    assert!(!outcome.complete);
}

#[test]
fn test_exhaustive_finds_scheduler_bug() {
    init_logging();
    let engine = TransitionEngine::new(ReferenceCluster::with_scheduler(FlipScheduler));
    let outcome = explore_exhaustive(
        flip_state(3, MessageId::new(0)),
        &engine,
        ExhaustiveLimits::default(),
    );

    let failure = outcome.failure.expect("flip scheduler must be caught");
    assert_eq!(
        failure.error.kind(),
        ErrorKind::InvariantViolation("minimum_churn".to_string())
    );
    assert_eq!(failure.timeline().len(), 4);
}

#[test]
fn test_replayed_timeline_reproduces_log() {
    init_logging();
    set_sim_seed(99);
    let original = drive(join_state(3, 2), &engine(), &mut RandomChoice, 1000).expect("run");

    let text = format_timeline(&original.choices);
    let history = parse_timeline(&text).expect("timeline parses");
    let replayed =
        replay_timeline(join_state(3, 2), &engine(), &history, 1000).expect("replay runs");

    let a: Vec<&LogEntry> = original.entries().collect();
    let b: Vec<&LogEntry> = replayed.entries().collect();
    assert_eq!(a, b);
    assert_eq!(original.replica, replayed.replica);
}

#[test]
fn test_one_engine_explores_branches_in_parallel() {
    fn assert_shareable<T: Send + Sync>(_: &T) {}

    init_logging();
    let engine = engine();
    assert_shareable(&engine);

    let lengths: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = [vec![0, 0, 0], vec![1, 0, 1]]
            .into_iter()
            .map(|indices| {
                let engine = &engine;
                scope.spawn(move || {
                    drive(join_state(2, 1), engine, &mut IndexChoice::new(indices), 1000)
                        .map(|done| done.log.len())
                        .unwrap_or_else(|f| panic!("branch failed: {f}"))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("branch thread"))
            .collect()
    });

    // 2 prepares, 1 accept, 1 notify, 2 peer registrations
    assert_eq!(lengths, vec![6, 6]);
}
