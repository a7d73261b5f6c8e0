//! Seed queues for the reference cluster beyond the plain join seed: a job
//! client and scripted departures.
//!
//! Departures are appended behind the departing actor's add-virtual-peer
//! entry. A group departure is written by one of the group's own peers and
//! waits until the cluster has settled (every group joined, no join in
//! flight, the group at full strength), so no join protocol entry is ever
//! left behind a departed writer. It also keeps a departing group from
//! observing a pending join: were it the last member, nobody would be left
//! to abort that join.

use std::collections::{BTreeMap, BTreeSet};

use crate::driver::ActorQueue;
use crate::model::{
    ActorId, ArgValue, CommandKind, GroupId, JobId, LogEntry, PeerId, Replica, TaskId, TaskSpec,
    args,
};

/// The actor that submits and kills jobs. Its commands are peerless, so it
/// never needs to join.
pub fn client_actor() -> ActorId {
    ActorId::group("client")
}

/// A submit-job entry. `tasks` pairs task ids with their minimum peers.
pub fn submit_job(job: &str, tasks: &[(&str, usize)], required_tags: &[&str]) -> LogEntry {
    let tasks = tasks
        .iter()
        .map(|(id, min_peers)| TaskSpec {
            id: TaskId::new(*id),
            min_peers: *min_peers,
        })
        .collect();
    let tags: BTreeSet<String> = required_tags.iter().map(|t| t.to_string()).collect();
    LogEntry::new(CommandKind::SubmitJob)
        .with_arg(args::JOB_ID, ArgValue::Job(JobId::new(job)))
        .with_arg(args::TASKS, ArgValue::Tasks(tasks))
        .with_arg(args::REQUIRED_TAGS, ArgValue::Tags(tags))
}

/// A kill-job entry.
pub fn kill_job(job: &str) -> LogEntry {
    LogEntry::new(CommandKind::KillJob).with_arg(args::JOB_ID, ArgValue::Job(JobId::new(job)))
}

/// A gc entry.
pub fn gc() -> LogEntry {
    LogEntry::new(CommandKind::Gc)
}

/// The client queue holding `entries`, in order.
pub fn client_queue(entries: impl IntoIterator<Item = LogEntry>) -> BTreeMap<ActorId, ActorQueue> {
    BTreeMap::from([(client_actor(), ActorQueue::from_entries(entries))])
}

/// Make `peer` leave once it has joined.
///
/// Returns `false` if `peer` has no seed queue.
pub fn add_peer_departure(queues: &mut BTreeMap<ActorId, ActorQueue>, peer: &PeerId) -> bool {
    let Some(queue) = queues.get_mut(&ActorId::Peer(peer.clone())) else {
        return false;
    };
    queue.extend([
        LogEntry::new(CommandKind::LeaveCluster).with_arg(args::ID, ArgValue::Peer(peer.clone()))
    ]);
    true
}

fn settled(replica: &Replica, group: &GroupId, groups: usize, peers: usize) -> bool {
    replica.groups().len() == groups
        && replica.prepared().is_empty()
        && replica.accepted().is_empty()
        && replica.peers_of(group).len() == peers
}

/// Make `group` leave, written by `writer` (one of its peers), once the
/// cluster of `groups` groups has settled with `peers_per_group` peers in
/// `group`.
///
/// Returns `false` if `writer` has no seed queue.
pub fn add_group_departure(
    queues: &mut BTreeMap<ActorId, ActorQueue>,
    group: &GroupId,
    writer: &PeerId,
    groups: usize,
    peers_per_group: usize,
) -> bool {
    let Some(queue) = queues.remove(&ActorId::Peer(writer.clone())) else {
        return false;
    };
    let leaving = group.clone();
    let mut queue = queue.with_predicate(move |replica, head| match head.kind {
        CommandKind::GroupLeaveCluster => settled(replica, &leaving, groups, peers_per_group),
        _ => replica.is_joined_group(&leaving),
    });
    queue.extend([LogEntry::new(CommandKind::GroupLeaveCluster)
        .with_arg(args::ID, ArgValue::Group(group.clone()))]);
    queues.insert(ActorId::Peer(writer.clone()), queue);
    true
}
