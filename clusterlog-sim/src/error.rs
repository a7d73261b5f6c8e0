//! Error types for interleaving exploration.
//!
//! Every variant is fatal for the exploration run that raised it: nothing is
//! retried. The runner records the failing seed and choice timeline so the
//! failure can be shrunk and replayed.

use std::fmt;

use thiserror::Error;

use crate::model::{ActorId, LogEntry, Replica};

/// Details of a failed transition invariant.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Name of the invariant that failed.
    pub invariant: String,
    /// What went wrong.
    pub message: String,
    /// Replica before the entry was applied.
    pub old: Replica,
    /// Replica after the entry was applied.
    pub new: Replica,
    /// The committed entry that caused the transition.
    pub entry: LogEntry,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invariant '{}' violated by [{}]: {} (old version {:?}, new version {:?})",
            self.invariant,
            self.entry,
            self.message,
            self.old.version(),
            self.new.version()
        )
    }
}

/// Errors that abort an exploration run.
#[derive(Debug, Clone, Error)]
pub enum ExplorationError {
    /// Queues remain but none of them is selectable.
    #[error("deadlock after {log_len} entries: no selectable queue among {pending:?}")]
    Deadlock {
        /// Owners of the queues still pending.
        pending: Vec<ActorId>,
        /// Committed log length when the deadlock was detected.
        log_len: usize,
    },

    /// The committed log grew past the safety bound.
    #[error("log overflow: {log_len} entries exceeds limit {limit}")]
    Overflow {
        /// Configured bound.
        limit: usize,
        /// Committed log length.
        log_len: usize,
    },

    /// A transition invariant failed.
    #[error("{0}")]
    InvariantViolation(Box<InvariantViolation>),

    /// Two seed queues were registered for the same actor.
    #[error("duplicate actor queue: {0}")]
    DuplicateActor(ActorId),
}

/// Coarse classification of an [`ExplorationError`].
///
/// Shrinking keeps a candidate choice sequence only if it reproduces a
/// failure of the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ExplorationError::Deadlock`].
    Deadlock,
    /// See [`ExplorationError::Overflow`].
    Overflow,
    /// See [`ExplorationError::InvariantViolation`], by invariant name.
    InvariantViolation(String),
    /// See [`ExplorationError::DuplicateActor`].
    DuplicateActor,
}

impl ExplorationError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExplorationError::Deadlock { .. } => ErrorKind::Deadlock,
            ExplorationError::Overflow { .. } => ErrorKind::Overflow,
            ExplorationError::InvariantViolation(v) => {
                ErrorKind::InvariantViolation(v.invariant.clone())
            }
            ExplorationError::DuplicateActor(_) => ErrorKind::DuplicateActor,
        }
    }

    /// The violation details, if this is an invariant failure.
    pub fn violation(&self) -> Option<&InvariantViolation> {
        match self {
            ExplorationError::InvariantViolation(v) => Some(v),
            _ => None,
        }
    }
}

/// A type alias for `Result<T, ExplorationError>`.
pub type ExplorationResult<T> = Result<T, ExplorationError>;
