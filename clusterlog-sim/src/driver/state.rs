//! The exploration accumulator.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::engine::TransitionDebug;
use crate::error::ExplorationError;
use crate::model::{ActorId, LogEntry, MessageId, Replica};

use super::queue::ActorQueue;

/// One committed log position: the entry, its diff and what it triggered.
#[derive(Debug, Clone)]
pub struct CommittedEntry<D> {
    /// The committed entry, carrying its message id.
    pub entry: LogEntry,
    /// Model diff for the transition.
    pub diff: D,
    /// Active actors and their reactions.
    pub debug: TransitionDebug,
}

/// Everything an exploration run has produced so far.
///
/// States are plain values: branching clones them, and committing an entry
/// never touches snapshots already in the log.
#[derive(Debug, Clone)]
pub struct ExplorationState<D> {
    /// The realized replica.
    pub replica: Replica,
    /// Message id the next commit receives.
    pub next_message_id: MessageId,
    /// Message id of the first commit.
    pub initial_message_id: MessageId,
    /// Pending entries per actor. Drained queues are removed.
    pub queues: BTreeMap<ActorId, ActorQueue>,
    /// The committed log, in order.
    pub log: Vec<CommittedEntry<D>>,
    /// The actor chosen at each commit.
    pub choices: Vec<ActorId>,
    /// The candidate index chosen at each commit.
    pub choice_indices: Vec<usize>,
}

impl<D> ExplorationState<D> {
    /// A state with an empty log.
    pub fn new(
        replica: Replica,
        queues: BTreeMap<ActorId, ActorQueue>,
        initial_message_id: MessageId,
    ) -> Self {
        let queues = queues.into_iter().filter(|(_, q)| !q.is_empty()).collect();
        Self {
            replica,
            next_message_id: initial_message_id,
            initial_message_id,
            queues,
            log: Vec::new(),
            choices: Vec::new(),
            choice_indices: Vec::new(),
        }
    }

    /// Whether every queue has drained.
    pub fn is_done(&self) -> bool {
        self.queues.is_empty()
    }

    /// Owners of the queues still pending.
    pub fn pending(&self) -> Vec<ActorId> {
        self.queues.keys().cloned().collect()
    }

    /// Committed entries, in order.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter().map(|c| &c.entry)
    }

    /// The committed log as JSON (entries and their debug records).
    pub fn log_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Row<'a> {
            entry: &'a LogEntry,
            debug: &'a TransitionDebug,
        }
        let rows: Vec<Row<'_>> = self
            .log
            .iter()
            .map(|c| Row {
                entry: &c.entry,
                debug: &c.debug,
            })
            .collect();
        serde_json::to_string_pretty(&rows)
    }
}

/// A fatal error together with the state that triggered it.
///
/// The state is the one the failing step started from: its log holds every
/// entry committed before the failure.
#[derive(Debug, Clone)]
pub struct ExplorationFailure<D> {
    /// What went wrong.
    pub error: ExplorationError,
    /// The state the failing step started from.
    pub state: ExplorationState<D>,
    /// Actor and candidate index of the step that failed, when the failure
    /// happened while applying a chosen entry.
    pub failed_choice: Option<(ActorId, usize)>,
}

impl<D> ExplorationFailure<D> {
    /// A failure not tied to a chosen step.
    pub fn new(error: ExplorationError, state: ExplorationState<D>) -> Self {
        Self {
            error,
            state,
            failed_choice: None,
        }
    }

    /// Choice timeline up to and including the failing step.
    pub fn timeline(&self) -> Vec<ActorId> {
        let mut timeline = self.state.choices.clone();
        timeline.extend(self.failed_choice.iter().map(|(actor, _)| actor.clone()));
        timeline
    }

    /// Candidate indices up to and including the failing step.
    pub fn choice_indices(&self) -> Vec<usize> {
        let mut indices = self.state.choice_indices.clone();
        indices.extend(self.failed_choice.iter().map(|(_, index)| *index));
        indices
    }
}

impl<D> fmt::Display for ExplorationFailure<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (after {} committed entries)",
            self.error,
            self.state.log.len()
        )
    }
}

impl<D: fmt::Debug> std::error::Error for ExplorationFailure<D> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of a driver step or run.
pub type DriveResult<D> = Result<ExplorationState<D>, Box<ExplorationFailure<D>>>;
