//! Membership index consistency.

use crate::model::{LogEntry, Replica};

use super::invariant_trait::TransitionInvariant;

/// The group index and its inverse agree, and every allocated peer is a
/// joined peer.
pub struct IndexConsistency;

impl TransitionInvariant for IndexConsistency {
    fn name(&self) -> &str {
        "index_consistency"
    }

    fn check(&self, _old: &Replica, new: &Replica, _entry: &LogEntry) -> Result<(), String> {
        new.check_indexes()
    }
}
