//! Seed builders: the initial population of actor queues.
//!
//! A seed is a set of groups, each owning some virtual peers. Every group
//! starts with a prepare-join-cluster entry and every peer with the
//! add-virtual-peer entry that registers it, gated on its group having
//! joined.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::driver::{ActorQueue, ExplorationState};
use crate::error::{ExplorationError, ExplorationResult};
use crate::model::{
    ActorId, ArgValue, CommandKind, GroupId, LogEntry, MessageId, PeerId, Replica, args,
};
use crate::sim::sim_random_range_or_default;

/// How many groups to build and how many peers each owns.
#[derive(Debug, Clone)]
pub enum GroupLayout {
    /// Exactly `groups` groups of `peers_per_group` peers.
    Fixed {
        /// Number of groups.
        groups: usize,
        /// Peers owned by each group.
        peers_per_group: usize,
    },
    /// Group count and per-group peer count drawn from the simulation RNG.
    Random {
        /// Range of the group count.
        groups: Range<usize>,
        /// Range of each group's peer count.
        peers_per_group: Range<usize>,
    },
}

impl GroupLayout {
    fn group_count(&self) -> usize {
        match self {
            GroupLayout::Fixed { groups, .. } => *groups,
            GroupLayout::Random { groups, .. } => draw(groups),
        }
    }

    fn peer_count(&self) -> usize {
        match self {
            GroupLayout::Fixed {
                peers_per_group, ..
            } => *peers_per_group,
            GroupLayout::Random {
                peers_per_group, ..
            } => draw(peers_per_group),
        }
    }
}

fn draw(range: &Range<usize>) -> usize {
    sim_random_range_or_default(range.clone())
}

/// Build group ids `g1..gN`, each owning peers `gI-p1..gI-pM`.
pub fn build_groups_and_peers(layout: &GroupLayout) -> BTreeMap<GroupId, BTreeSet<PeerId>> {
    (1..=layout.group_count())
        .map(|g| {
            let group = GroupId::new(format!("g{g}"));
            let peers = (1..=layout.peer_count())
                .map(|p| PeerId::new(format!("g{g}-p{p}")))
                .collect();
            (group, peers)
        })
        .collect()
}

/// One prepare-join-cluster queue per group and one add-virtual-peer queue
/// per peer.
///
/// `extra_args` are merged into every entry without overriding the roles
/// set here. Fails with [`ExplorationError::DuplicateActor`] if two queues
/// would belong to the same actor.
pub fn build_join_queues(
    groups: &BTreeMap<GroupId, BTreeSet<PeerId>>,
    extra_args: &BTreeMap<String, ArgValue>,
) -> ExplorationResult<BTreeMap<ActorId, ActorQueue>> {
    let mut queues = BTreeMap::new();

    for (group, peers) in groups {
        let prepare = LogEntry::new(CommandKind::PrepareJoinCluster)
            .with_arg(args::JOINER, ArgValue::Group(group.clone()))
            .with_extra_args(extra_args);
        insert_unique(
            &mut queues,
            ActorId::Group(group.clone()),
            ActorQueue::from_entries([prepare]),
        )?;

        for peer in peers {
            let add = LogEntry::new(CommandKind::AddVirtualPeer)
                .with_arg(args::ID, ArgValue::Peer(peer.clone()))
                .with_arg(args::GROUP_ID, ArgValue::Group(group.clone()))
                .with_arg(args::TAGS, ArgValue::Tags(BTreeSet::new()))
                .with_extra_args(extra_args);
            let owner = group.clone();
            let queue = ActorQueue::from_entries([add])
                .with_predicate(move |replica, _| replica.is_joined_group(&owner));
            insert_unique(&mut queues, ActorId::Peer(peer.clone()), queue)?;
        }
    }

    Ok(queues)
}

/// Merge seed queues, rejecting actors that appear in more than one.
pub fn merge_queues(
    seeds: impl IntoIterator<Item = BTreeMap<ActorId, ActorQueue>>,
) -> ExplorationResult<BTreeMap<ActorId, ActorQueue>> {
    let mut merged = BTreeMap::new();
    for seed in seeds {
        for (actor, queue) in seed {
            insert_unique(&mut merged, actor, queue)?;
        }
    }
    Ok(merged)
}

fn insert_unique(
    queues: &mut BTreeMap<ActorId, ActorQueue>,
    actor: ActorId,
    queue: ActorQueue,
) -> ExplorationResult<()> {
    if queues.contains_key(&actor) {
        return Err(ExplorationError::DuplicateActor(actor));
    }
    queues.insert(actor, queue);
    Ok(())
}

/// An exploration state over an empty cluster seeded with join queues for
/// `layout`.
pub fn join_seed<D>(
    layout: &GroupLayout,
    extra_args: &BTreeMap<String, ArgValue>,
    initial_message_id: MessageId,
) -> ExplorationResult<ExplorationState<D>> {
    let groups = build_groups_and_peers(layout);
    let queues = build_join_queues(&groups, extra_args)?;
    Ok(ExplorationState::new(
        Replica::new(),
        queues,
        initial_message_id,
    ))
}
