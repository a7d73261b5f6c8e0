//! Bounded exhaustive exploration of every interleaving.
//!
//! Depth-first over an explicit stack of states: each popped state expands
//! into one child per selectable queue. States are values, so siblings never
//! interfere.

use crate::engine::{ClusterModel, TransitionEngine};
use crate::error::ExplorationError;
use crate::model::ActorId;

use super::interleave::{DEFAULT_MAX_LOG_ENTRIES, commit_actor, select_candidates};
use super::state::{ExplorationFailure, ExplorationState};

/// Bounds for [`explore_exhaustive`].
#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveLimits {
    /// Stop after this many complete histories.
    pub max_histories: usize,
    /// Per-history log length bound.
    pub max_log_entries: usize,
}

impl Default for ExhaustiveLimits {
    fn default() -> Self {
        Self {
            max_histories: 10_000,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
        }
    }
}

/// What an exhaustive search found.
#[derive(Debug)]
pub struct ExhaustiveOutcome<D> {
    /// Choice sequence of every complete history, in discovery order.
    pub histories: Vec<Vec<ActorId>>,
    /// Whether the whole tree was explored within the bounds.
    pub complete: bool,
    /// The first failure encountered, which stops the search.
    pub failure: Option<Box<ExplorationFailure<D>>>,
}

/// Explore every interleaving reachable from `initial`.
pub fn explore_exhaustive<M>(
    initial: ExplorationState<M::Diff>,
    engine: &TransitionEngine<M>,
    limits: ExhaustiveLimits,
) -> ExhaustiveOutcome<M::Diff>
where
    M: ClusterModel,
{
    let mut outcome = ExhaustiveOutcome {
        histories: Vec::new(),
        complete: true,
        failure: None,
    };
    let mut stack = vec![initial];

    while let Some(state) = stack.pop() {
        if state.is_done() {
            outcome.histories.push(state.choices.clone());
            if outcome.histories.len() >= limits.max_histories && !stack.is_empty() {
                tracing::info!(
                    histories = outcome.histories.len(),
                    "history bound reached, search incomplete"
                );
                outcome.complete = false;
                break;
            }
            continue;
        }

        if state.log.len() > limits.max_log_entries {
            let log_len = state.log.len();
            outcome.failure = Some(Box::new(ExplorationFailure::new(
                ExplorationError::Overflow {
                    limit: limits.max_log_entries,
                    log_len,
                },
                state,
            )));
            return outcome;
        }

        let candidates = select_candidates(&state);
        if candidates.is_empty() {
            let pending = state.pending();
            let log_len = state.log.len();
            outcome.failure = Some(Box::new(ExplorationFailure::new(
                ExplorationError::Deadlock { pending, log_len },
                state,
            )));
            return outcome;
        }

        // Push in reverse so the first candidate is explored first.
        for (index, actor) in candidates.iter().enumerate().rev() {
            match commit_actor(state.clone(), engine, actor, index) {
                Ok(child) => stack.push(child),
                Err(failure) => {
                    outcome.failure = Some(failure);
                    return outcome;
                }
            }
        }
    }

    tracing::debug!(
        histories = outcome.histories.len(),
        complete = outcome.complete,
        "exhaustive exploration finished"
    );
    outcome
}
