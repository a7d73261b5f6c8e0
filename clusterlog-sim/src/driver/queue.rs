//! Per-actor pending-entry queues.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::model::{LogEntry, Replica};

/// Gate deciding whether a queue's head entry may be committed against the
/// current replica.
pub type SelectionPredicate = Arc<dyn Fn(&Replica, &LogEntry) -> bool + Send + Sync>;

/// The entries one actor intends to write, in order.
///
/// Each actor is a single physical writer, so its queue is strictly FIFO.
#[derive(Clone, Default)]
pub struct ActorQueue {
    entries: VecDeque<LogEntry>,
    predicate: Option<SelectionPredicate>,
}

impl ActorQueue {
    /// An empty queue with no predicate.
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue holding `entries`, in order.
    pub fn from_entries(entries: impl IntoIterator<Item = LogEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            predicate: None,
        }
    }

    /// Gate selection of this queue's head entry.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Replica, &LogEntry) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Append entries at the tail.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        self.entries.extend(entries);
    }

    /// The next entry to commit.
    pub fn head(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Remove and return the head entry.
    pub fn pop(&mut self) -> Option<LogEntry> {
        self.entries.pop_front()
    }

    /// Whether the head passes the predicate (always true without one).
    pub fn head_passes(&self, replica: &Replica) -> bool {
        match (&self.predicate, self.head()) {
            (Some(predicate), Some(head)) => predicate(replica, head),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pending entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

impl fmt::Debug for ActorQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorQueue")
            .field("entries", &self.entries)
            .field("gated", &self.predicate.is_some())
            .finish()
    }
}
