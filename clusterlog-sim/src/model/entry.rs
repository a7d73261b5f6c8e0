//! Log entries: the commands actors write to the shared log.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{ActorId, GroupId, JobId, MessageId, PeerId, TaskId};

/// Argument role names used by log entries.
pub mod args {
    /// The group observing a joiner during the join protocol.
    pub const OBSERVER: &str = "observer";
    /// The subject of the command (peer or group, depending on the kind).
    pub const ID: &str = "id";
    /// The observer recorded in an accepted join.
    pub const ACCEPTED_OBSERVER: &str = "accepted-observer";
    /// The joiner recorded in an accepted join.
    pub const ACCEPTED_JOINER: &str = "accepted-joiner";
    /// The group asking to join.
    pub const JOINER: &str = "joiner";
    /// Owning group of a virtual peer.
    pub const GROUP_ID: &str = "group-id";
    /// Tags carried by a peer.
    pub const TAGS: &str = "tags";
    /// Job identifier.
    pub const JOB_ID: &str = "job-id";
    /// Tasks of a submitted job, with their minimum peer counts.
    pub const TASKS: &str = "tasks";
    /// Tags a job requires of the peers it is placed on.
    pub const REQUIRED_TAGS: &str = "required-tags";

    /// Roles inspected to discover actors that react to their own admission
    /// or removal before (or after) being an official member.
    pub const ACTIVATION_ROLES: [&str; 5] =
        [OBSERVER, ID, ACCEPTED_OBSERVER, ACCEPTED_JOINER, JOINER];
}

/// The closed set of command kinds accepted by the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    /// Submit a job with its tasks.
    SubmitJob,
    /// Kill a running job, releasing its peers.
    KillJob,
    /// Garbage-collect killed jobs from the replica.
    Gc,
    /// A single peer leaves the cluster.
    LeaveCluster,
    /// A whole group (and every peer it owns) leaves the cluster.
    GroupLeaveCluster,
    /// A group asks to join; an observer is picked.
    PrepareJoinCluster,
    /// The observer accepts the joiner.
    AcceptJoinCluster,
    /// The joiner is admitted into the group set.
    NotifyJoinCluster,
    /// A pending join is abandoned.
    AbortJoinCluster,
    /// A joined group registers one of its virtual peers.
    AddVirtualPeer,
    /// A peer signals it is ready to take work.
    SignalReady,
}

impl CommandKind {
    /// Every command kind, in declaration order.
    pub const ALL: [CommandKind; 11] = [
        CommandKind::SubmitJob,
        CommandKind::KillJob,
        CommandKind::Gc,
        CommandKind::LeaveCluster,
        CommandKind::GroupLeaveCluster,
        CommandKind::PrepareJoinCluster,
        CommandKind::AcceptJoinCluster,
        CommandKind::NotifyJoinCluster,
        CommandKind::AbortJoinCluster,
        CommandKind::AddVirtualPeer,
        CommandKind::SignalReady,
    ];

    /// Commands that may be written by an actor which is not a member of the
    /// cluster. A queue headed by one of these is always selectable.
    pub fn is_peerless(self) -> bool {
        matches!(
            self,
            CommandKind::SubmitJob | CommandKind::KillJob | CommandKind::Gc
        )
    }

    /// Commands of the join/leave protocol. For these the argument roles in
    /// [`args::ACTIVATION_ROLES`] name additional actors that react to the
    /// entry.
    pub fn is_membership_protocol(self) -> bool {
        matches!(
            self,
            CommandKind::PrepareJoinCluster
                | CommandKind::AcceptJoinCluster
                | CommandKind::NotifyJoinCluster
                | CommandKind::AbortJoinCluster
                | CommandKind::LeaveCluster
                | CommandKind::GroupLeaveCluster
                | CommandKind::AddVirtualPeer
        )
    }

    /// The kebab-case name of this command.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::SubmitJob => "submit-job",
            CommandKind::KillJob => "kill-job",
            CommandKind::Gc => "gc",
            CommandKind::LeaveCluster => "leave-cluster",
            CommandKind::GroupLeaveCluster => "group-leave-cluster",
            CommandKind::PrepareJoinCluster => "prepare-join-cluster",
            CommandKind::AcceptJoinCluster => "accept-join-cluster",
            CommandKind::NotifyJoinCluster => "notify-join-cluster",
            CommandKind::AbortJoinCluster => "abort-join-cluster",
            CommandKind::AddVirtualPeer => "add-virtual-peer",
            CommandKind::SignalReady => "signal-ready",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A task declared by a submit-job entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task identifier.
    pub id: TaskId,
    /// Minimum number of peers the task needs before it can run.
    pub min_peers: usize,
}

/// A command argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgValue {
    /// A peer group.
    Group(GroupId),
    /// A virtual peer.
    Peer(PeerId),
    /// A job.
    Job(JobId),
    /// A job's tasks.
    Tasks(Vec<TaskSpec>),
    /// A tag set.
    Tags(BTreeSet<String>),
    /// Free-form text.
    Text(String),
}

impl ArgValue {
    /// The actor named by this value, if it names one.
    pub fn as_actor(&self) -> Option<ActorId> {
        match self {
            ArgValue::Group(g) => Some(ActorId::Group(g.clone())),
            ArgValue::Peer(p) => Some(ActorId::Peer(p.clone())),
            _ => None,
        }
    }
}

/// A command written to the shared log.
///
/// Entries are built without a message id; the interleaving driver assigns
/// one when the entry is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// What the command does.
    pub kind: CommandKind,
    /// Command-specific named arguments.
    pub args: BTreeMap<String, ArgValue>,
    /// Log position, present once committed.
    pub message_id: Option<MessageId>,
}

impl LogEntry {
    /// Create an entry with no arguments.
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            args: BTreeMap::new(),
            message_id: None,
        }
    }

    /// Add an argument.
    pub fn with_arg(mut self, role: &str, value: ArgValue) -> Self {
        self.args.insert(role.to_string(), value);
        self
    }

    /// Merge extra arguments, keeping existing roles untouched.
    pub fn with_extra_args(mut self, extra: &BTreeMap<String, ArgValue>) -> Self {
        for (role, value) in extra {
            self.args
                .entry(role.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Get an argument by role.
    pub fn arg(&self, role: &str) -> Option<&ArgValue> {
        self.args.get(role)
    }

    /// Get a peer argument by role.
    pub fn peer_arg(&self, role: &str) -> Option<&PeerId> {
        match self.args.get(role) {
            Some(ArgValue::Peer(p)) => Some(p),
            _ => None,
        }
    }

    /// Get a group argument by role.
    pub fn group_arg(&self, role: &str) -> Option<&GroupId> {
        match self.args.get(role) {
            Some(ArgValue::Group(g)) => Some(g),
            _ => None,
        }
    }

    /// Get a job argument by role.
    pub fn job_arg(&self, role: &str) -> Option<&JobId> {
        match self.args.get(role) {
            Some(ArgValue::Job(j)) => Some(j),
            _ => None,
        }
    }

    /// Get a tag-set argument by role.
    pub fn tags_arg(&self, role: &str) -> Option<&BTreeSet<String>> {
        match self.args.get(role) {
            Some(ArgValue::Tags(t)) => Some(t),
            _ => None,
        }
    }

    /// Get the task list argument, if any.
    pub fn tasks_arg(&self) -> Option<&[TaskSpec]> {
        match self.args.get(args::TASKS) {
            Some(ArgValue::Tasks(t)) => Some(t),
            _ => None,
        }
    }

    /// Actors named under the fixed activation roles.
    ///
    /// Only meaningful for membership-protocol commands; other kinds return
    /// an empty list.
    // TODO: new command kinds with other role names are not discovered here;
    // revisit once such a kind exists instead of scanning every argument.
    pub fn activated_actors(&self) -> Vec<ActorId> {
        if !self.kind.is_membership_protocol() {
            return Vec::new();
        }
        args::ACTIVATION_ROLES
            .iter()
            .filter_map(|role| self.args.get(*role))
            .filter_map(ArgValue::as_actor)
            .collect()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message_id {
            Some(id) => write!(f, "{} {}", id, self.kind)?,
            None => write!(f, "uncommitted {}", self.kind)?,
        }
        for (role, value) in &self.args {
            match value {
                ArgValue::Group(g) => write!(f, " {role}={g}")?,
                ArgValue::Peer(p) => write!(f, " {role}={p}")?,
                ArgValue::Job(j) => write!(f, " {role}={j}")?,
                ArgValue::Tasks(t) => write!(f, " {role}=[{} tasks]", t.len())?,
                ArgValue::Tags(t) => write!(f, " {role}={t:?}")?,
                ArgValue::Text(s) => write!(f, " {role}={s}")?,
            }
        }
        Ok(())
    }
}
