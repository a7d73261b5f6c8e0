//! Choice strategies: which selectable queue is serviced next.
//!
//! Producing a choice is kept apart from applying it, so the same driver
//! runs random fuzzing, deterministic replay and the shrinker's index
//! sequences.

use std::collections::VecDeque;

use crate::model::ActorId;
use crate::sim::sim_random_range;

/// Picks one of a non-empty candidate list.
pub trait ChoiceStrategy {
    /// Index into `candidates` of the queue to service. `candidates` is
    /// never empty; out-of-range results are clamped by the driver.
    fn choose(&mut self, candidates: &[ActorId]) -> usize;
}

/// Uniform random choice from the thread-local simulation RNG.
///
/// Seed the RNG with [`crate::sim::set_sim_seed`] before a run to make it
/// reproducible.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomChoice;

impl ChoiceStrategy for RandomChoice {
    fn choose(&mut self, candidates: &[ActorId]) -> usize {
        sim_random_range(0..candidates.len())
    }
}

/// Re-drives a recorded actor history.
///
/// When the recorded actor is not selectable (or the history is exhausted)
/// the first candidate is taken instead, so a replay of a trimmed history
/// still runs to completion.
#[derive(Debug, Clone)]
pub struct ReplayChoice {
    history: VecDeque<ActorId>,
    diverged: usize,
}

impl ReplayChoice {
    /// Replay `history` in order.
    pub fn new(history: impl IntoIterator<Item = ActorId>) -> Self {
        Self {
            history: history.into_iter().collect(),
            diverged: 0,
        }
    }

    /// How many steps could not follow the recorded history.
    pub fn diverged(&self) -> usize {
        self.diverged
    }
}

impl ChoiceStrategy for ReplayChoice {
    fn choose(&mut self, candidates: &[ActorId]) -> usize {
        let Some(wanted) = self.history.pop_front() else {
            self.diverged += 1;
            return 0;
        };
        match candidates.iter().position(|c| *c == wanted) {
            Some(index) => index,
            None => {
                tracing::debug!(actor = %wanted, "recorded actor not selectable, taking first candidate");
                self.diverged += 1;
                0
            }
        }
    }
}

/// Follows a list of candidate indices, then always picks the first.
///
/// Indices past the end of the candidate list are clamped to the last one.
#[derive(Debug, Clone)]
pub struct IndexChoice {
    indices: VecDeque<usize>,
}

impl IndexChoice {
    /// Follow `indices` in order.
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }
}

impl ChoiceStrategy for IndexChoice {
    fn choose(&mut self, candidates: &[ActorId]) -> usize {
        let wanted = self.indices.pop_front().unwrap_or(0);
        wanted.min(candidates.len().saturating_sub(1))
    }
}
