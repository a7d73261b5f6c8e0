//! # Clusterlog Simulation Harness
//!
//! Model-based verification of a cluster's replicated command log.
//!
//! Many actors (member groups and their virtual peers) concurrently propose
//! commands against one totally-ordered log. The harness explores the orders
//! in which those proposals can land, replays every order through the
//! cluster's deterministic transition function, and checks each snapshot
//! transition. The headline check: the task scheduler never moves more work
//! between peers than the provable minimum.
//!
//! ## Core Components
//!
//! - [`Replica`]: immutable cluster snapshot with structural sharing
//! - [`TransitionEngine`]: applies an entry, checks invariants, collects reactions
//! - [`driver`]: actor queues, choice strategies, random and exhaustive exploration
//! - [`invariants`]: index consistency, slot stability, minimum churn
//! - [`seed`]: initial join queues for a group/peer layout
//! - [`ExplorationBuilder`]: multi-seed runs with shrinking and replayable timelines
//! - [`simulations::cluster`]: a reference cluster model to drive the harness
//!
//! ## How a run proceeds
//!
//! ```text
//!  seed builder ──> ExplorationState ──┐
//!                                      v
//!               ┌── select candidates (peerless, or owner may write + predicate)
//!               │        │
//!               │        v choice strategy (random / replay / index)
//!               │   pop head ──> engine.apply ──> invariants
//!               │        │                            │ violation: stop
//!               │        v                            v
//!               └── append reactions of active actors to their queues
//!                        │
//!                        v all queues drained
//!                final log + replica + choice timeline
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use clusterlog_sim::{ExplorationBuilder, GroupLayout, TransitionEngine, join_seed};
//! use clusterlog_sim::simulations::cluster::ReferenceCluster;
//!
//! let report = ExplorationBuilder::new(TransitionEngine::new(ReferenceCluster::new()))
//!     .seed(|initial| {
//!         join_seed(
//!             &GroupLayout::Fixed { groups: 3, peers_per_group: 2 },
//!             &Default::default(),
//!             initial,
//!         )
//!     })
//!     .set_iterations(20)
//!     .run();
//! println!("{report}");
//! ```
//!
//! Debugging a failing seed:
//!
//! ```ignore
//! ExplorationBuilder::new(engine)
//!     .seed(seed_fn)
//!     .set_debug_seeds(vec![failing_seed])
//!     .run();
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Core Modules
// =============================================================================

/// Error taxonomy for exploration runs.
pub mod error;

/// Cluster data model.
pub mod model;

/// Deterministic simulation randomness.
pub mod sim;

/// Transition invariants.
pub mod invariants;

/// Transition engine and the system-under-test interfaces.
pub mod engine;

/// Interleaving driver.
pub mod driver;

/// Seed builders.
pub mod seed;

/// Multi-seed runner, replay and shrinking.
pub mod runner;

/// Models of the system under test.
pub mod simulations;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, ExplorationError, ExplorationResult, InvariantViolation};

pub use model::{
    ActorId, ArgValue, CommandKind, GroupId, JobId, LogEntry, MessageId, PeerId, Replica, SlotId,
    TaskId, TaskSpec, args,
};

pub use sim::{
    get_current_sim_seed, get_rng_call_count, reset_sim_rng, set_sim_seed, sim_random,
    sim_random_range, sim_random_range_or_default,
};

pub use invariants::{
    IndexConsistency, InvariantChecker, MinimumChurn, SlotStability, TransitionInvariant,
    invariant_fn,
};

pub use engine::{
    ActorState, ClusterModel, Messenger, NoopMessenger, ReactionContext, ReactionRegistry,
    TransitionEngine,
};

pub use driver::{
    ActorQueue, ChoiceStrategy, DEFAULT_MAX_LOG_ENTRIES, ExhaustiveLimits, ExhaustiveOutcome,
    ExplorationFailure, ExplorationState, IndexChoice, RandomChoice, ReplayChoice,
    choose_and_commit, drive, explore_exhaustive, select_candidates,
};

pub use seed::{GroupLayout, build_groups_and_peers, build_join_queues, join_seed, merge_queues};

pub use runner::{
    ExplorationBuilder, ExplorationConfig, ExplorationReport, FailureReport, ParseTimelineError,
    format_timeline, parse_timeline, replay_timeline, shrink_choices,
};
