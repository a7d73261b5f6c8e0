//! Seed sequencing across iterations.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hands out one seed per iteration: explicit seeds first, then seeds
/// derived from a base.
pub(crate) struct IterationManager {
    iterations: usize,
    seeds: Vec<u64>,
    base_seed: u64,
    iteration_count: usize,
}

impl IterationManager {
    /// Run `iterations` iterations, starting with `initial_seeds`.
    pub(crate) fn new(iterations: usize, initial_seeds: Vec<u64>, base_seed: Option<u64>) -> Self {
        let base_seed = base_seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(12345)
        });

        Self {
            iterations: iterations.max(initial_seeds.len()),
            seeds: initial_seeds,
            base_seed,
            iteration_count: 0,
        }
    }

    /// Check if more iterations should be run.
    pub(crate) fn should_continue(&self) -> bool {
        self.iteration_count < self.iterations
    }

    /// Get the seed for the current iteration and advance to the next.
    pub(crate) fn next_iteration(&mut self) -> u64 {
        let seed = if self.iteration_count < self.seeds.len() {
            self.seeds[self.iteration_count]
        } else {
            let mut hasher = DefaultHasher::new();
            self.base_seed.hash(&mut hasher);
            self.iteration_count.hash(&mut hasher);
            let new_seed = hasher.finish();
            self.seeds.push(new_seed);
            new_seed
        };

        self.iteration_count += 1;

        tracing::info!(
            "Starting iteration {}/{} with seed {}",
            self.iteration_count,
            self.iterations,
            seed
        );

        seed
    }

    /// Get all seeds used so far.
    pub(crate) fn seeds_used(&self) -> &[u64] {
        &self.seeds[..self.iteration_count]
    }
}
