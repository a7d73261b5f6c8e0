//! Transition engine: applies a committed entry to a replica, checks the
//! transition invariants and collects the reactions of active actors.

pub mod collaborators;
pub mod reactions;
pub mod transition;

pub use collaborators::{ActorState, ClusterModel, Messenger, NoopMessenger};
pub use reactions::{ReactionContext, ReactionRegistry};
pub use transition::{Applied, TransitionDebug, TransitionEngine};
