//! Timeline serialization for exploration replay.
//!
//! A timeline is the actor chosen at each commit. It is formatted as a
//! human-readable string for reports and parsed back to re-drive the exact
//! same interleaving with a [`ReplayChoice`].

use std::fmt;

use crate::driver::{DriveResult, ExplorationState, ReplayChoice, drive};
use crate::engine::{ClusterModel, TransitionEngine};
use crate::model::{ActorId, GroupId, PeerId};

const GROUP_PREFIX: &str = "group/";
const PEER_PREFIX: &str = "peer/";

/// Error parsing a timeline string.
#[derive(Debug)]
pub struct ParseTimelineError {
    /// Description of the parse error.
    pub message: String,
}

impl fmt::Display for ParseTimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse timeline error: {}", self.message)
    }
}

impl std::error::Error for ParseTimelineError {}

fn format_actor(actor: &ActorId) -> String {
    match actor {
        ActorId::Group(g) => format!("{GROUP_PREFIX}{g}"),
        ActorId::Peer(p) => format!("{PEER_PREFIX}{p}"),
    }
}

/// Format a choice history as a human-readable timeline string.
///
/// Each segment is `group/<id>` or `peer/<id>`, joined by ` -> `.
///
/// # Example
///
/// ```
/// use clusterlog_sim::{ActorId, format_timeline};
///
/// let history = vec![ActorId::group("g1"), ActorId::peer("g1-p1")];
/// assert_eq!(format_timeline(&history), "group/g1 -> peer/g1-p1");
/// ```
pub fn format_timeline(history: &[ActorId]) -> String {
    history
        .iter()
        .map(format_actor)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Parse a timeline string back into a choice history.
///
/// Accepts the format produced by [`format_timeline`].
///
/// # Errors
///
/// Returns an error if a segment has no `group/` or `peer/` prefix or an
/// empty id.
///
/// # Example
///
/// ```
/// use clusterlog_sim::{ActorId, parse_timeline};
///
/// let history = parse_timeline("group/g1 -> peer/g1-p1").unwrap();
/// assert_eq!(history, vec![ActorId::group("g1"), ActorId::peer("g1-p1")]);
/// ```
pub fn parse_timeline(s: &str) -> Result<Vec<ActorId>, ParseTimelineError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split(" -> ")
        .map(|segment| {
            let segment = segment.trim();
            let actor = if let Some(id) = segment.strip_prefix(GROUP_PREFIX) {
                (!id.is_empty()).then(|| ActorId::Group(GroupId::new(id)))
            } else if let Some(id) = segment.strip_prefix(PEER_PREFIX) {
                (!id.is_empty()).then(|| ActorId::Peer(PeerId::new(id)))
            } else {
                return Err(ParseTimelineError {
                    message: format!("missing actor kind in segment: {segment}"),
                });
            };
            actor.ok_or_else(|| ParseTimelineError {
                message: format!("empty actor id in segment: {segment}"),
            })
        })
        .collect()
}

/// Re-drive `initial` following `history`.
///
/// Steps where the recorded actor is not selectable fall back to the first
/// candidate; the run is then no longer a faithful replay, which is logged.
pub fn replay_timeline<M: ClusterModel>(
    initial: ExplorationState<M::Diff>,
    engine: &TransitionEngine<M>,
    history: &[ActorId],
    max_log_entries: usize,
) -> DriveResult<M::Diff> {
    let mut choice = ReplayChoice::new(history.iter().cloned());
    let result = drive(initial, engine, &mut choice, max_log_entries);
    if choice.diverged() > 0 {
        tracing::warn!(
            diverged = choice.diverged(),
            recorded = history.len(),
            "replay diverged from the recorded timeline"
        );
    }
    result
}
