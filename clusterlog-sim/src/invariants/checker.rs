//! Runs a set of transition invariants and turns the first failure into an
//! [`ExplorationError::InvariantViolation`].

use crate::error::{ExplorationError, ExplorationResult, InvariantViolation};
use crate::model::{LogEntry, Replica};

use super::churn::MinimumChurn;
use super::index_consistency::IndexConsistency;
use super::invariant_trait::TransitionInvariant;
use super::slot_stability::SlotStability;

/// An ordered set of invariants applied to every committed transition.
pub struct InvariantChecker {
    invariants: Vec<Box<dyn TransitionInvariant>>,
}

impl Default for InvariantChecker {
    fn default() -> Self {
        Self::standard()
    }
}

impl InvariantChecker {
    /// A checker with no invariants.
    pub fn empty() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    /// Index consistency, slot stability and the minimum-churn bound.
    pub fn standard() -> Self {
        Self::empty()
            .with(IndexConsistency)
            .with(SlotStability)
            .with(MinimumChurn)
    }

    /// Add an invariant.
    pub fn with(mut self, invariant: impl TransitionInvariant + 'static) -> Self {
        self.invariants.push(Box::new(invariant));
        self
    }

    /// Add an already boxed invariant, e.g. from [`super::invariant_fn`].
    pub fn with_boxed(mut self, invariant: Box<dyn TransitionInvariant>) -> Self {
        self.invariants.push(invariant);
        self
    }

    /// Names of the registered invariants, in check order.
    pub fn names(&self) -> Vec<&str> {
        self.invariants.iter().map(|i| i.name()).collect()
    }

    /// Check the transition `old -> new` caused by `entry`.
    pub fn check(&self, old: &Replica, new: &Replica, entry: &LogEntry) -> ExplorationResult<()> {
        for invariant in &self.invariants {
            if let Err(message) = invariant.check(old, new, entry) {
                tracing::warn!(
                    invariant = invariant.name(),
                    entry = %entry,
                    "transition invariant violated: {}",
                    message
                );
                return Err(ExplorationError::InvariantViolation(Box::new(
                    InvariantViolation {
                        invariant: invariant.name().to_string(),
                        message,
                        old: old.clone(),
                        new: new.clone(),
                        entry: entry.clone(),
                    },
                )));
            }
        }
        Ok(())
    }
}
