//! Slot stability: a peer that stays on a task keeps its slot.

use crate::model::{LogEntry, Replica};

use super::churn::allocation_triples;
use super::invariant_trait::TransitionInvariant;

/// For every (peer, job, task) allocated both before and after a transition,
/// the peer's slot id for that task is unchanged.
pub struct SlotStability;

impl TransitionInvariant for SlotStability {
    fn name(&self) -> &str {
        "slot_stability"
    }

    fn check(&self, old: &Replica, new: &Replica, _entry: &LogEntry) -> Result<(), String> {
        let before = allocation_triples(old);
        let after = allocation_triples(new);

        for (peer, job, task) in before.intersection(&after) {
            let old_slot = old.slot_id(job, task, peer);
            let new_slot = new.slot_id(job, task, peer);
            if old_slot != new_slot {
                return Err(format!(
                    "peer {peer} stayed on {job}/{task} but its slot moved from {old_slot:?} to {new_slot:?}"
                ));
            }
        }
        Ok(())
    }
}
