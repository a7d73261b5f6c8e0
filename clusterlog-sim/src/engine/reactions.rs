//! Per-command reaction dispatch.
//!
//! Reactions are dispatched over the closed [`CommandKind`] enum: each kind
//! has at most one registered handler, and kinds without a handler produce
//! no reactions. Models build a registry once and forward
//! [`ClusterModel::reactions`](super::ClusterModel::reactions) to
//! [`ReactionRegistry::react`].

use std::collections::BTreeMap;

use crate::model::{CommandKind, LogEntry, Replica};

use super::collaborators::ActorState;

/// Everything a reaction handler can look at.
pub struct ReactionContext<'a, D> {
    /// The committed entry.
    pub entry: &'a LogEntry,
    /// Snapshot before the entry.
    pub old: &'a Replica,
    /// Snapshot after the entry.
    pub new: &'a Replica,
    /// Model-specific diff.
    pub diff: &'a D,
    /// The reacting actor.
    pub actor: &'a ActorState,
}

type Handler<D> = Box<dyn Fn(&ReactionContext<'_, D>) -> Vec<LogEntry> + Send + Sync>;

/// Handlers keyed by command kind.
pub struct ReactionRegistry<D> {
    handlers: BTreeMap<CommandKind, Handler<D>>,
}

impl<D> Default for ReactionRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> ReactionRegistry<D> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn register<F>(mut self, kind: CommandKind, handler: F) -> Self
    where
        F: Fn(&ReactionContext<'_, D>) -> Vec<LogEntry> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Whether `kind` has a handler.
    pub fn handles(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Dispatch to the handler registered for the entry's kind.
    pub fn react(&self, ctx: &ReactionContext<'_, D>) -> Vec<LogEntry> {
        match self.handlers.get(&ctx.entry.kind) {
            Some(handler) => handler(ctx),
            None => Vec::new(),
        }
    }
}
