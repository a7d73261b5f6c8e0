//! Multi-seed exploration runner.
//!
//! Runs a seed state under many RNG seeds, records every failing seed with
//! its choice timeline, shrinks the first failure and reports the results.

pub mod builder;
pub mod config;
mod iteration;
pub mod replay;
pub mod report;
pub mod shrink;

pub use builder::ExplorationBuilder;
pub use config::ExplorationConfig;
pub use replay::{ParseTimelineError, format_timeline, parse_timeline, replay_timeline};
pub use report::{ExplorationReport, FailureReport};
pub use shrink::{ShrinkOutcome, shrink_choices};
