//! Immutable cluster snapshot.
//!
//! A [`Replica`] is created once per committed log entry and never mutated
//! afterwards. Every collection sits behind an [`Arc`]: cloning a replica is
//! cheap, and the editing methods below go through [`Arc::make_mut`], so an
//! edited clone copies only the collections it touches while the snapshot it
//! was cloned from (and every log entry still pointing at it) stays intact.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::entry::TaskSpec;
use super::ids::{GroupId, JobId, MessageId, PeerId, SlotId, TaskId};

/// job → task → ordered peers.
pub type Allocations = BTreeMap<JobId, BTreeMap<TaskId, Vec<PeerId>>>;

/// job → task → peer → slot.
pub type TaskSlotIds = BTreeMap<JobId, BTreeMap<TaskId, BTreeMap<PeerId, SlotId>>>;

/// Snapshot of the full cluster state at one log position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    peers: Arc<BTreeSet<PeerId>>,
    groups: Arc<BTreeSet<GroupId>>,
    groups_index: Arc<BTreeMap<GroupId, BTreeSet<PeerId>>>,
    groups_reverse_index: Arc<BTreeMap<PeerId, GroupId>>,
    jobs: Arc<Vec<JobId>>,
    tasks: Arc<BTreeMap<JobId, Vec<TaskId>>>,
    min_required_peers: Arc<BTreeMap<JobId, BTreeMap<TaskId, usize>>>,
    allocations: Arc<Allocations>,
    task_slot_ids: Arc<TaskSlotIds>,
    required_tags: Arc<BTreeMap<JobId, BTreeSet<String>>>,
    peer_tags: Arc<BTreeMap<PeerId, BTreeSet<String>>>,
    killed_jobs: Arc<BTreeSet<JobId>>,
    /// joiner → observer, for joins that have been prepared.
    prepared: Arc<BTreeMap<GroupId, GroupId>>,
    /// joiner → observer, for joins the observer has accepted.
    accepted: Arc<BTreeMap<GroupId, GroupId>>,
    version: Option<MessageId>,
}

impl Replica {
    /// An empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Joined peers.
    pub fn peers(&self) -> &BTreeSet<PeerId> {
        &self.peers
    }

    /// Joined groups.
    pub fn groups(&self) -> &BTreeSet<GroupId> {
        &self.groups
    }

    /// group → member peers.
    pub fn groups_index(&self) -> &BTreeMap<GroupId, BTreeSet<PeerId>> {
        &self.groups_index
    }

    /// peer → owning group.
    pub fn groups_reverse_index(&self) -> &BTreeMap<PeerId, GroupId> {
        &self.groups_reverse_index
    }

    /// Whether the peer is a joined member.
    pub fn is_joined_peer(&self, peer: &PeerId) -> bool {
        self.peers.contains(peer)
    }

    /// Whether the group is a joined member.
    pub fn is_joined_group(&self, group: &GroupId) -> bool {
        self.groups.contains(group)
    }

    /// Peers owned by a group (empty if the group is unknown).
    pub fn peers_of(&self, group: &GroupId) -> BTreeSet<PeerId> {
        self.groups_index.get(group).cloned().unwrap_or_default()
    }

    /// The group owning a peer.
    pub fn group_of(&self, peer: &PeerId) -> Option<&GroupId> {
        self.groups_reverse_index.get(peer)
    }

    /// Jobs in submission order.
    pub fn jobs(&self) -> &[JobId] {
        &self.jobs
    }

    /// Tasks of a job in declaration order.
    pub fn tasks(&self, job: &JobId) -> &[TaskId] {
        self.tasks.get(job).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Minimum peers a task needs (0 if unknown).
    pub fn min_required_peers(&self, job: &JobId, task: &TaskId) -> usize {
        self.min_required_peers
            .get(job)
            .and_then(|t| t.get(task))
            .copied()
            .unwrap_or(0)
    }

    /// All allocations.
    pub fn allocations(&self) -> &Allocations {
        &self.allocations
    }

    /// Peers allocated to a task.
    pub fn task_allocation(&self, job: &JobId, task: &TaskId) -> &[PeerId] {
        self.allocations
            .get(job)
            .and_then(|t| t.get(task))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The (job, task) a peer is allocated to, if any.
    pub fn allocated_task(&self, peer: &PeerId) -> Option<(&JobId, &TaskId)> {
        self.allocations.iter().find_map(|(job, tasks)| {
            tasks
                .iter()
                .find(|(_, peers)| peers.contains(peer))
                .map(|(task, _)| (job, task))
        })
    }

    /// Jobs with at least one allocated peer.
    pub fn jobs_with_allocations(&self) -> BTreeSet<JobId> {
        self.allocations
            .iter()
            .filter(|(_, tasks)| tasks.values().any(|peers| !peers.is_empty()))
            .map(|(job, _)| job.clone())
            .collect()
    }

    /// All slot ids.
    pub fn task_slot_ids(&self) -> &TaskSlotIds {
        &self.task_slot_ids
    }

    /// A peer's slot within a task.
    pub fn slot_id(&self, job: &JobId, task: &TaskId, peer: &PeerId) -> Option<SlotId> {
        self.task_slot_ids
            .get(job)
            .and_then(|t| t.get(task))
            .and_then(|p| p.get(peer))
            .copied()
    }

    /// job → required tags.
    pub fn required_tags(&self) -> &BTreeMap<JobId, BTreeSet<String>> {
        &self.required_tags
    }

    /// Tags required by one job (empty if none).
    pub fn job_required_tags(&self, job: &JobId) -> BTreeSet<String> {
        self.required_tags.get(job).cloned().unwrap_or_default()
    }

    /// Tags carried by a peer (empty if none).
    pub fn peer_tags(&self, peer: &PeerId) -> BTreeSet<String> {
        self.peer_tags.get(peer).cloned().unwrap_or_default()
    }

    /// Jobs that were killed and not yet garbage-collected.
    pub fn killed_jobs(&self) -> &BTreeSet<JobId> {
        &self.killed_jobs
    }

    /// Prepared joins: joiner → observer.
    pub fn prepared(&self) -> &BTreeMap<GroupId, GroupId> {
        &self.prepared
    }

    /// Accepted joins: joiner → observer.
    pub fn accepted(&self) -> &BTreeMap<GroupId, GroupId> {
        &self.accepted
    }

    /// Message id of the last applied entry.
    pub fn version(&self) -> Option<MessageId> {
        self.version
    }

    /// Whether any collection is still shared with `other`.
    ///
    /// Used to observe structural sharing between consecutive snapshots.
    pub fn shares_allocations_with(&self, other: &Replica) -> bool {
        Arc::ptr_eq(&self.allocations, &other.allocations)
    }

    /// Check that the group index and its inverse agree, and that every
    /// allocated peer is a joined peer.
    pub fn check_indexes(&self) -> Result<(), String> {
        for (group, peers) in self.groups_index.iter() {
            for peer in peers {
                match self.groups_reverse_index.get(peer) {
                    Some(owner) if owner == group => {}
                    Some(owner) => {
                        return Err(format!(
                            "peer {peer} indexed under group {group} but reverse index says {owner}"
                        ));
                    }
                    None => {
                        return Err(format!(
                            "peer {peer} indexed under group {group} but missing from reverse index"
                        ));
                    }
                }
            }
        }
        for (peer, group) in self.groups_reverse_index.iter() {
            let indexed = self
                .groups_index
                .get(group)
                .is_some_and(|peers| peers.contains(peer));
            if !indexed {
                return Err(format!(
                    "reverse index maps {peer} to {group} but group index does not list it"
                ));
            }
        }
        for (job, tasks) in self.allocations.iter() {
            for (task, peers) in tasks {
                if let Some(stray) = peers.iter().find(|p| !self.peers.contains(*p)) {
                    return Err(format!(
                        "peer {stray} allocated to {job}/{task} is not a joined peer"
                    ));
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Copy-on-write edits, used by transition functions on their own clone
    // ------------------------------------------------------------------

    /// Return this snapshot with its version set.
    pub fn with_version(mut self, id: MessageId) -> Self {
        self.version = Some(id);
        self
    }

    /// Admit a group.
    pub fn add_group(&mut self, group: GroupId) {
        Arc::make_mut(&mut self.groups_index)
            .entry(group.clone())
            .or_default();
        Arc::make_mut(&mut self.groups).insert(group);
    }

    /// Remove a group and every peer it owns.
    pub fn remove_group(&mut self, group: &GroupId) {
        for peer in self.peers_of(group) {
            self.remove_peer(&peer);
        }
        Arc::make_mut(&mut self.groups).remove(group);
        Arc::make_mut(&mut self.groups_index).remove(group);
        Arc::make_mut(&mut self.prepared).retain(|joiner, obs| joiner != group && obs != group);
        Arc::make_mut(&mut self.accepted).retain(|joiner, obs| joiner != group && obs != group);
    }

    /// Admit a peer owned by `group`.
    pub fn add_peer(&mut self, peer: PeerId, group: GroupId, tags: BTreeSet<String>) {
        Arc::make_mut(&mut self.groups_index)
            .entry(group.clone())
            .or_default()
            .insert(peer.clone());
        Arc::make_mut(&mut self.groups_reverse_index).insert(peer.clone(), group);
        if !tags.is_empty() {
            Arc::make_mut(&mut self.peer_tags).insert(peer.clone(), tags);
        }
        Arc::make_mut(&mut self.peers).insert(peer);
    }

    /// Remove a peer, releasing any task it was allocated to.
    pub fn remove_peer(&mut self, peer: &PeerId) {
        self.deallocate(peer);
        Arc::make_mut(&mut self.peers).remove(peer);
        if let Some(group) = Arc::make_mut(&mut self.groups_reverse_index).remove(peer)
            && let Some(members) = Arc::make_mut(&mut self.groups_index).get_mut(&group)
        {
            members.remove(peer);
        }
        if self.peer_tags.contains_key(peer) {
            Arc::make_mut(&mut self.peer_tags).remove(peer);
        }
    }

    /// Register a submitted job.
    pub fn add_job(&mut self, job: JobId, tasks: &[TaskSpec], required_tags: BTreeSet<String>) {
        if self.jobs.contains(&job) {
            return;
        }
        Arc::make_mut(&mut self.tasks).insert(
            job.clone(),
            tasks.iter().map(|t| t.id.clone()).collect(),
        );
        Arc::make_mut(&mut self.min_required_peers).insert(
            job.clone(),
            tasks.iter().map(|t| (t.id.clone(), t.min_peers)).collect(),
        );
        if !required_tags.is_empty() {
            Arc::make_mut(&mut self.required_tags).insert(job.clone(), required_tags);
        }
        Arc::make_mut(&mut self.jobs).push(job);
    }

    /// Kill a job: release its peers and mark it for garbage collection.
    pub fn kill_job(&mut self, job: &JobId) {
        if !self.jobs.contains(job) {
            return;
        }
        if self.allocations.contains_key(job) {
            Arc::make_mut(&mut self.allocations).remove(job);
        }
        if self.task_slot_ids.contains_key(job) {
            Arc::make_mut(&mut self.task_slot_ids).remove(job);
        }
        Arc::make_mut(&mut self.killed_jobs).insert(job.clone());
    }

    /// Drop every killed job from the replica.
    pub fn gc(&mut self) {
        if self.killed_jobs.is_empty() {
            return;
        }
        let killed = std::mem::take(Arc::make_mut(&mut self.killed_jobs));
        Arc::make_mut(&mut self.jobs).retain(|j| !killed.contains(j));
        Arc::make_mut(&mut self.tasks).retain(|j, _| !killed.contains(j));
        Arc::make_mut(&mut self.min_required_peers).retain(|j, _| !killed.contains(j));
        Arc::make_mut(&mut self.required_tags).retain(|j, _| !killed.contains(j));
    }

    /// Allocate a peer to a task, giving it the lowest free slot.
    ///
    /// A peer already on another task is released from it first. A peer
    /// already on this task keeps its slot.
    pub fn allocate(&mut self, job: &JobId, task: &TaskId, peer: &PeerId) {
        if let Some((j, t)) = self.allocated_task(peer) {
            if j == job && t == task {
                return;
            }
            self.deallocate(peer);
        }

        let slots = Arc::make_mut(&mut self.task_slot_ids)
            .entry(job.clone())
            .or_default()
            .entry(task.clone())
            .or_default();
        let used: BTreeSet<SlotId> = slots.values().copied().collect();
        let free = (0u32..)
            .map(SlotId)
            .find(|s| !used.contains(s))
            .unwrap_or(SlotId(used.len() as u32));
        slots.insert(peer.clone(), free);

        Arc::make_mut(&mut self.allocations)
            .entry(job.clone())
            .or_default()
            .entry(task.clone())
            .or_default()
            .push(peer.clone());
    }

    /// Release a peer from whatever task it is allocated to.
    pub fn deallocate(&mut self, peer: &PeerId) {
        let Some((job, task)) = self
            .allocated_task(peer)
            .map(|(j, t)| (j.clone(), t.clone()))
        else {
            return;
        };

        let allocations = Arc::make_mut(&mut self.allocations);
        if let Some(tasks) = allocations.get_mut(&job) {
            if let Some(peers) = tasks.get_mut(&task) {
                peers.retain(|p| p != peer);
                if peers.is_empty() {
                    tasks.remove(&task);
                }
            }
            if tasks.is_empty() {
                allocations.remove(&job);
            }
        }

        let slot_ids = Arc::make_mut(&mut self.task_slot_ids);
        if let Some(tasks) = slot_ids.get_mut(&job) {
            if let Some(peers) = tasks.get_mut(&task) {
                peers.remove(peer);
                if peers.is_empty() {
                    tasks.remove(&task);
                }
            }
            if tasks.is_empty() {
                slot_ids.remove(&job);
            }
        }
    }

    /// Record a prepared join.
    pub fn prepare_join(&mut self, joiner: GroupId, observer: GroupId) {
        Arc::make_mut(&mut self.prepared).insert(joiner, observer);
    }

    /// Move a prepared join to accepted.
    pub fn accept_join(&mut self, joiner: GroupId, observer: GroupId) {
        Arc::make_mut(&mut self.prepared).remove(&joiner);
        Arc::make_mut(&mut self.accepted).insert(joiner, observer);
    }

    /// Forget any join bookkeeping for `joiner`.
    pub fn clear_join(&mut self, joiner: &GroupId) {
        if self.prepared.contains_key(joiner) {
            Arc::make_mut(&mut self.prepared).remove(joiner);
        }
        if self.accepted.contains_key(joiner) {
            Arc::make_mut(&mut self.accepted).remove(joiner);
        }
    }

    /// Whether `joiner` has a prepared or accepted join in flight.
    pub fn join_pending(&self, joiner: &GroupId) -> bool {
        self.prepared.contains_key(joiner) || self.accepted.contains_key(joiner)
    }
}
