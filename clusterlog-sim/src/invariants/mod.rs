//! Invariants checked on every committed transition.
//!
//! - [`IndexConsistency`]: group index and inverse agree; allocated peers are members
//! - [`SlotStability`]: a peer retained on a task keeps its slot id
//! - [`MinimumChurn`]: the scheduler never exceeds the minimum-churn bound
//!
//! A violation is a defect in the system under test, never a transient
//! condition: the run stops and the failure carries both replicas and the
//! entry that caused the transition.

pub mod checker;
pub mod churn;
pub mod index_consistency;
pub mod invariant_trait;
pub mod slot_stability;

pub use checker::InvariantChecker;
pub use churn::{
    AllocationTriple, MinimumChurn, actual_churn, allocation_triples, churn_exemption,
    expected_churn, expected_transition_churn, forced_departures,
};
pub use index_consistency::IndexConsistency;
pub use invariant_trait::{TransitionInvariant, invariant_fn};
pub use slot_stability::SlotStability;
