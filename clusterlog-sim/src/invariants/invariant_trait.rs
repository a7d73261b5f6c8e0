//! Trait-based invariants checked on every committed transition.

use crate::model::{LogEntry, Replica};

/// A named property of a single replica transition.
///
/// Invariants are checked after every committed entry with the snapshot
/// before and after the entry. A violation aborts the exploration run, so
/// implementations should describe the failure precisely: the message ends up
/// in the failure report next to both replicas.
///
/// # Example
///
/// ```ignore
/// struct PeersNeverVanish;
///
/// impl TransitionInvariant for PeersNeverVanish {
///     fn name(&self) -> &str { "peers_never_vanish" }
///     fn check(&self, old: &Replica, new: &Replica, _entry: &LogEntry) -> Result<(), String> {
///         if new.peers().len() + 1 < old.peers().len() {
///             return Err("more than one peer left in a single entry".into());
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait TransitionInvariant: Send + Sync {
    /// The human-readable name of this invariant.
    fn name(&self) -> &str;

    /// Check the transition `old -> new` caused by `entry`.
    fn check(&self, old: &Replica, new: &Replica, entry: &LogEntry) -> Result<(), String>;
}

/// Create a boxed invariant from a name and closure.
///
/// # Example
///
/// ```ignore
/// let inv = invariant_fn("version_advances", |_old, new, entry| {
///     if new.version() != entry.message_id {
///         return Err(format!("version {:?} != {:?}", new.version(), entry.message_id));
///     }
///     Ok(())
/// });
/// ```
pub fn invariant_fn<F>(name: &str, check: F) -> Box<dyn TransitionInvariant>
where
    F: Fn(&Replica, &Replica, &LogEntry) -> Result<(), String> + Send + Sync + 'static,
{
    Box::new(FnInvariant {
        name: name.to_string(),
        check,
    })
}

struct FnInvariant<F> {
    name: String,
    check: F,
}

impl<F> TransitionInvariant for FnInvariant<F>
where
    F: Fn(&Replica, &Replica, &LogEntry) -> Result<(), String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, old: &Replica, new: &Replica, entry: &LogEntry) -> Result<(), String> {
        (self.check)(old, new, entry)
    }
}
