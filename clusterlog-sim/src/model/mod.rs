//! Cluster data model: identifiers, log entries and replica snapshots.

pub mod entry;
pub mod ids;
pub mod replica;

pub use entry::{ArgValue, CommandKind, LogEntry, TaskSpec, args};
pub use ids::{ActorId, GroupId, JobId, MessageId, PeerId, SlotId, TaskId};
pub use replica::{Allocations, Replica, TaskSlotIds};
