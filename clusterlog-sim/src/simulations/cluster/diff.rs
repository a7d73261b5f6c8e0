//! Replica delta consumed by the reference reactions.

use std::collections::{BTreeMap, BTreeSet};

use crate::invariants::{AllocationTriple, allocation_triples};
use crate::model::{GroupId, PeerId, Replica};

/// What one transition changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterDiff {
    /// Groups admitted.
    pub joined_groups: BTreeSet<GroupId>,
    /// Groups removed.
    pub departed_groups: BTreeSet<GroupId>,
    /// Peers admitted.
    pub joined_peers: BTreeSet<PeerId>,
    /// Peers removed.
    pub departed_peers: BTreeSet<PeerId>,
    /// Allocations gained.
    pub newly_allocated: BTreeSet<AllocationTriple>,
    /// Allocations lost.
    pub deallocated: BTreeSet<AllocationTriple>,
    /// Joins newly prepared: joiner → observer.
    pub prepared: BTreeMap<GroupId, GroupId>,
    /// Joins newly accepted: joiner → observer.
    pub accepted: BTreeMap<GroupId, GroupId>,
    /// Joiners whose in-flight join vanished without them being admitted.
    pub orphaned_joins: BTreeSet<GroupId>,
}

fn added<T: Ord + Clone>(old: &BTreeSet<T>, new: &BTreeSet<T>) -> BTreeSet<T> {
    new.difference(old).cloned().collect()
}

fn fresh(
    old: &BTreeMap<GroupId, GroupId>,
    new: &BTreeMap<GroupId, GroupId>,
) -> BTreeMap<GroupId, GroupId> {
    new.iter()
        .filter(|(joiner, observer)| old.get(*joiner) != Some(*observer))
        .map(|(j, o)| (j.clone(), o.clone()))
        .collect()
}

impl ClusterDiff {
    /// Compute the delta between two snapshots.
    pub fn between(old: &Replica, new: &Replica) -> Self {
        let before = allocation_triples(old);
        let after = allocation_triples(new);

        let orphaned_joins = old
            .prepared()
            .keys()
            .chain(old.accepted().keys())
            .filter(|joiner| !new.join_pending(joiner) && !new.is_joined_group(joiner))
            .cloned()
            .collect();

        Self {
            joined_groups: added(old.groups(), new.groups()),
            departed_groups: added(new.groups(), old.groups()),
            joined_peers: added(old.peers(), new.peers()),
            departed_peers: added(new.peers(), old.peers()),
            newly_allocated: added(&before, &after),
            deallocated: added(&after, &before),
            prepared: fresh(old.prepared(), new.prepared()),
            accepted: fresh(old.accepted(), new.accepted()),
            orphaned_joins,
        }
    }
}
