//! Runner configuration.

use serde::{Deserialize, Serialize};

use crate::driver::DEFAULT_MAX_LOG_ENTRIES;

/// How an [`ExplorationBuilder`](super::ExplorationBuilder) runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Number of seeds to explore.
    pub iterations: usize,
    /// Seeds used first, in order. Further iterations derive their seed.
    pub seeds: Vec<u64>,
    /// Base for derived seeds. `None` takes it from the wall clock.
    pub base_seed: Option<u64>,
    /// Overflow bound on the committed log.
    pub max_log_entries: usize,
    /// Message id given to the first committed entry.
    pub initial_message_id: u64,
    /// Minimize the choice sequence of the first failing seed.
    pub shrink: bool,
    /// Upper bound on replays spent shrinking.
    pub max_shrink_attempts: usize,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            seeds: Vec::new(),
            base_seed: None,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
            initial_message_id: 0,
            shrink: true,
            max_shrink_attempts: 500,
        }
    }
}
