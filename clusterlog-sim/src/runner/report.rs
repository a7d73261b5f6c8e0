//! Exploration results and reporting.

use std::fmt;

use crate::error::ExplorationError;

/// Everything recorded about one failing seed.
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// The failing seed.
    pub seed: u64,
    /// The error that stopped the run.
    pub error: ExplorationError,
    /// Actor timeline of the original failing run.
    pub timeline: String,
    /// Actor timeline after shrinking, if shrinking ran and succeeded.
    pub shrunk_timeline: Option<String>,
    /// Candidate indices after shrinking.
    pub shrunk_indices: Option<Vec<usize>>,
    /// The committed log up to the failure, as JSON.
    pub log_json: Option<String>,
}

/// Report of a multi-seed exploration.
#[derive(Debug, Clone, Default)]
pub struct ExplorationReport {
    /// Number of iterations executed
    pub iterations: usize,
    /// Number of successful runs
    pub successful_runs: usize,
    /// Number of failed runs
    pub failed_runs: usize,
    /// Entries committed across successful runs
    pub total_entries: usize,
    /// Seeds used for each iteration
    pub seeds_used: Vec<u64>,
    /// failed seeds
    pub seeds_failing: Vec<u64>,
    /// Details of each failure, in seed order
    pub failures: Vec<FailureReport>,
}

impl ExplorationReport {
    /// Calculate the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            (self.successful_runs as f64 / self.iterations as f64) * 100.0
        }
    }

    /// Get the average committed log length of successful runs.
    pub fn average_log_len(&self) -> f64 {
        if self.successful_runs == 0 {
            0.0
        } else {
            self.total_entries as f64 / self.successful_runs as f64
        }
    }

    /// Whether every iteration succeeded.
    pub fn is_success(&self) -> bool {
        self.failed_runs == 0
    }
}

impl fmt::Display for ExplorationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Exploration Report ===")?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "Successful: {}", self.successful_runs)?;
        writeln!(f, "Failed: {}", self.failed_runs)?;
        writeln!(f, "Success Rate: {:.2}%", self.success_rate())?;
        writeln!(f)?;
        writeln!(f, "Average Log Length: {:.1}", self.average_log_len())?;

        if !self.seeds_failing.is_empty() {
            writeln!(f)?;
            writeln!(f, "Faulty seeds: {:?}", self.seeds_failing)?;
        }

        for failure in &self.failures {
            writeln!(f)?;
            writeln!(f, "=== Failure (seed {}) ===", failure.seed)?;
            writeln!(f, "Error: {}", failure.error)?;
            writeln!(f, "Timeline: {}", failure.timeline)?;
            if let Some(ref shrunk) = failure.shrunk_timeline {
                writeln!(f, "Shrunk timeline: {}", shrunk)?;
            }
        }

        writeln!(f)?;

        Ok(())
    }
}
