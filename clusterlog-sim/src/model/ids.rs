//! Identifiers used throughout the cluster model.
//!
//! - [`PeerId`]: a virtual peer (a worker that can be allocated to a task)
//! - [`GroupId`]: a peer group (a physical member owning several peers)
//! - [`JobId`] / [`TaskId`]: a submitted job and one of its tasks
//! - [`SlotId`]: a peer's stable position within a task's allocation
//! - [`MessageId`]: position of a committed entry in the shared log
//! - [`ActorId`]: either a group or a peer, the owner of a pending-entry queue

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a virtual peer.
    PeerId
);

string_id!(
    /// Identifier of a peer group.
    GroupId
);

string_id!(
    /// Identifier of a submitted job.
    JobId
);

string_id!(
    /// Identifier of a task within a job.
    TaskId
);

/// Stable slot identifier of a peer within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot({})", self.0)
    }
}

/// Position of a committed entry in the shared log.
///
/// Assigned by the interleaving driver at commit time, increasing by exactly
/// one per commit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Create a new message id.
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    /// Get the next sequential message id.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg({})", self.0)
    }
}

/// The owner of a pending-entry queue: a peer group or a single peer.
///
/// Ordering puts groups before peers, which keeps candidate lists and
/// reaction fan-out in a deterministic order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActorId {
    /// A peer group.
    Group(GroupId),
    /// A virtual peer.
    Peer(PeerId),
}

impl ActorId {
    /// Shorthand for a group actor.
    pub fn group(id: impl Into<String>) -> Self {
        ActorId::Group(GroupId::new(id))
    }

    /// Shorthand for a peer actor.
    pub fn peer(id: impl Into<String>) -> Self {
        ActorId::Peer(PeerId::new(id))
    }

    /// The raw identifier, without the actor kind.
    pub fn as_str(&self) -> &str {
        match self {
            ActorId::Group(g) => g.as_str(),
            ActorId::Peer(p) => p.as_str(),
        }
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Group(g) => write!(f, "{g}"),
            ActorId::Peer(p) => write!(f, "{p}"),
        }
    }
}

impl From<GroupId> for ActorId {
    fn from(id: GroupId) -> Self {
        ActorId::Group(id)
    }
}

impl From<PeerId> for ActorId {
    fn from(id: PeerId) -> Self {
        ActorId::Peer(id)
    }
}
