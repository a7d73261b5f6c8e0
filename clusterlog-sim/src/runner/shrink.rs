//! Failure minimization over candidate-index sequences.
//!
//! A failing run is described by the candidate index chosen at each step.
//! Shrinking replays simplified sequences with an [`IndexChoice`] and keeps a
//! simplification only if it still fails with the same [`ErrorKind`]:
//!
//! 1. truncation: the shortest prefix that still fails (missing steps pick
//!    index 0);
//! 2. index lowering: each index is lowered toward 0, earliest step first.
//!
//! Both passes repeat until neither makes progress or the attempt budget is
//! spent. The sequence never grows.

use crate::driver::{ExplorationFailure, ExplorationState, IndexChoice, drive};
use crate::engine::{ClusterModel, TransitionEngine};
use crate::error::{ErrorKind, ExplorationResult};

/// A minimized failure.
#[derive(Debug)]
pub struct ShrinkOutcome<D> {
    /// The minimized candidate-index sequence.
    pub indices: Vec<usize>,
    /// The failure it reproduces.
    pub failure: Box<ExplorationFailure<D>>,
    /// Replays spent.
    pub attempts: usize,
}

struct Shrinker<'a, M: ClusterModel, F> {
    engine: &'a TransitionEngine<M>,
    initial: F,
    target: ErrorKind,
    max_log_entries: usize,
    max_attempts: usize,
    attempts: usize,
}

impl<M, F> Shrinker<'_, M, F>
where
    M: ClusterModel,
    F: Fn() -> ExplorationResult<ExplorationState<M::Diff>>,
{
    fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Replay `indices`; the failure if it has the target kind.
    fn reproduce(&mut self, indices: &[usize]) -> Option<Box<ExplorationFailure<M::Diff>>> {
        self.attempts += 1;
        let state = match (self.initial)() {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!(%error, "seed state could not be rebuilt while shrinking");
                return None;
            }
        };
        let mut choice = IndexChoice::new(indices.iter().copied());
        match drive(state, self.engine, &mut choice, self.max_log_entries) {
            Err(failure) if failure.error.kind() == self.target => Some(failure),
            _ => None,
        }
    }

    /// The part of `indices` the failing run actually consumed.
    fn consumed(indices: &[usize], failure: &ExplorationFailure<M::Diff>) -> Vec<usize> {
        let steps = failure.state.log.len() + 1;
        indices[..indices.len().min(steps)].to_vec()
    }

    fn truncate(
        &mut self,
        current: &mut Vec<usize>,
        best: &mut Box<ExplorationFailure<M::Diff>>,
    ) -> bool {
        for len in 0..current.len() {
            if self.exhausted() {
                return false;
            }
            let candidate = current[..len].to_vec();
            if let Some(failure) = self.reproduce(&candidate) {
                tracing::debug!(from = current.len(), to = len, "shrink: truncated");
                *current = Self::consumed(&candidate, &failure);
                *best = failure;
                return true;
            }
        }
        false
    }

    fn lower(
        &mut self,
        current: &mut Vec<usize>,
        best: &mut Box<ExplorationFailure<M::Diff>>,
    ) -> bool {
        for step in 0..current.len() {
            for value in 0..current[step] {
                if self.exhausted() {
                    return false;
                }
                let mut candidate = current.clone();
                candidate[step] = value;
                if let Some(failure) = self.reproduce(&candidate) {
                    tracing::debug!(step, from = current[step], to = value, "shrink: lowered");
                    *current = Self::consumed(&candidate, &failure);
                    *best = failure;
                    return true;
                }
            }
        }
        false
    }
}

/// Minimize `indices`, a candidate-index sequence whose replay from
/// `initial()` fails with `target`.
///
/// Returns `None` if `indices` itself does not reproduce `target`.
pub fn shrink_choices<M, F>(
    engine: &TransitionEngine<M>,
    initial: F,
    indices: &[usize],
    target: &ErrorKind,
    max_log_entries: usize,
    max_attempts: usize,
) -> Option<ShrinkOutcome<M::Diff>>
where
    M: ClusterModel,
    F: Fn() -> ExplorationResult<ExplorationState<M::Diff>>,
{
    let mut shrinker = Shrinker {
        engine,
        initial,
        target: target.clone(),
        max_log_entries,
        max_attempts: max_attempts.max(1),
        attempts: 0,
    };

    let mut best = shrinker.reproduce(indices)?;
    let mut current = Shrinker::<M, F>::consumed(indices, &best);

    while !shrinker.exhausted() {
        let truncated = shrinker.truncate(&mut current, &mut best);
        let lowered = shrinker.lower(&mut current, &mut best);
        if !truncated && !lowered {
            break;
        }
    }

    tracing::info!(
        original = indices.len(),
        shrunk = current.len(),
        attempts = shrinker.attempts,
        "shrinking finished"
    );

    Some(ShrinkOutcome {
        indices: current,
        failure: best,
        attempts: shrinker.attempts,
    })
}
