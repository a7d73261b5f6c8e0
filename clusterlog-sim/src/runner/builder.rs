//! Exploration builder pattern for configuring and running seeds.
//!
//! This module provides the main ExplorationBuilder type: it drives a seed
//! state through the interleaving driver once per seed, with random choices
//! from the seeded simulation RNG, and shrinks the first failure it finds.

use tracing::instrument;

use crate::driver::{ExplorationState, RandomChoice, drive};
use crate::engine::{ClusterModel, TransitionEngine};
use crate::error::ExplorationResult;
use crate::model::MessageId;

use super::config::ExplorationConfig;
use super::iteration::IterationManager;
use super::replay::format_timeline;
use super::report::{ExplorationReport, FailureReport};
use super::shrink::shrink_choices;

type SeedFactory<D> = Box<dyn Fn(MessageId) -> ExplorationResult<ExplorationState<D>>>;

/// Builder pattern for configuring and running interleaving explorations.
pub struct ExplorationBuilder<M: ClusterModel> {
    engine: TransitionEngine<M>,
    seed: Option<SeedFactory<M::Diff>>,
    config: ExplorationConfig,
}

impl<M: ClusterModel> ExplorationBuilder<M> {
    /// Create a builder around `engine` with the default configuration.
    pub fn new(engine: TransitionEngine<M>) -> Self {
        Self {
            engine,
            seed: None,
            config: ExplorationConfig::default(),
        }
    }

    /// Set the seed-state factory.
    ///
    /// It is called once per iteration (and once per shrink replay) after the
    /// simulation RNG is seeded, so random layouts are reproducible per seed.
    /// It receives the configured initial message id.
    pub fn seed(
        mut self,
        factory: impl Fn(MessageId) -> ExplorationResult<ExplorationState<M::Diff>> + 'static,
    ) -> Self {
        self.seed = Some(Box::new(factory));
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ExplorationConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of iterations to run.
    pub fn set_iterations(mut self, iterations: usize) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Set specific seeds for deterministic debugging and regression testing.
    pub fn set_debug_seeds(mut self, seeds: Vec<u64>) -> Self {
        self.config.seeds = seeds;
        self
    }

    /// Fix the base of derived seeds.
    pub fn set_base_seed(mut self, base_seed: u64) -> Self {
        self.config.base_seed = Some(base_seed);
        self
    }

    /// Set the overflow bound on the committed log.
    pub fn max_log_entries(mut self, max: usize) -> Self {
        self.config.max_log_entries = max;
        self
    }

    /// Set the message id of the first committed entry.
    pub fn initial_message_id(mut self, id: u64) -> Self {
        self.config.initial_message_id = id;
        self
    }

    /// Enable or disable shrinking of the first failure.
    pub fn shrink(mut self, enabled: bool) -> Self {
        self.config.shrink = enabled;
        self
    }

    /// Build the seed state for `seed`.
    fn initial_state(
        factory: &SeedFactory<M::Diff>,
        seed: u64,
        initial_message_id: MessageId,
    ) -> ExplorationResult<ExplorationState<M::Diff>> {
        crate::sim::set_sim_seed(seed);
        factory(initial_message_id)
    }

    /// Run every seed and generate a report.
    #[instrument(skip_all)]
    pub fn run(self) -> ExplorationReport {
        let Some(factory) = self.seed else {
            tracing::warn!("no seed state configured, nothing to explore");
            return ExplorationReport::default();
        };

        let config = self.config;
        let engine = self.engine;
        let initial_message_id = MessageId::new(config.initial_message_id);
        let mut iteration_manager =
            IterationManager::new(config.iterations, config.seeds.clone(), config.base_seed);
        let mut report = ExplorationReport::default();

        while iteration_manager.should_continue() {
            let seed = iteration_manager.next_iteration();
            report.iterations += 1;

            let state = match Self::initial_state(&factory, seed, initial_message_id) {
                Ok(state) => state,
                Err(error) => {
                    tracing::error!(seed, %error, "seed state rejected");
                    report.failed_runs += 1;
                    report.seeds_failing.push(seed);
                    report.failures.push(FailureReport {
                        seed,
                        error,
                        timeline: String::new(),
                        shrunk_timeline: None,
                        shrunk_indices: None,
                        log_json: None,
                    });
                    continue;
                }
            };

            match drive(state, &engine, &mut RandomChoice, config.max_log_entries) {
                Ok(done) => {
                    tracing::debug!(seed, entries = done.log.len(), "seed explored");
                    report.successful_runs += 1;
                    report.total_entries += done.log.len();
                }
                Err(failure) => {
                    tracing::error!(seed, error = %failure.error, "seed failed");
                    report.failed_runs += 1;
                    report.seeds_failing.push(seed);

                    let mut recorded = FailureReport {
                        seed,
                        error: failure.error.clone(),
                        timeline: format_timeline(&failure.timeline()),
                        shrunk_timeline: None,
                        shrunk_indices: None,
                        log_json: failure.state.log_json().ok(),
                    };

                    // Only the first failure is shrunk; later ones keep their raw timeline.
                    if config.shrink && report.failures.is_empty() {
                        let indices = failure.choice_indices();
                        let shrunk = shrink_choices(
                            &engine,
                            || Self::initial_state(&factory, seed, initial_message_id),
                            &indices,
                            &failure.error.kind(),
                            config.max_log_entries,
                            config.max_shrink_attempts,
                        );
                        if let Some(outcome) = shrunk {
                            recorded.shrunk_timeline =
                                Some(format_timeline(&outcome.failure.timeline()));
                            recorded.shrunk_indices = Some(outcome.indices);
                            recorded.log_json = outcome.failure.state.log_json().ok();
                        }
                    }

                    report.failures.push(recorded);
                }
            }
        }

        report.seeds_used = iteration_manager.seeds_used().to_vec();

        tracing::info!(
            iterations = report.iterations,
            failed = report.failed_runs,
            "exploration finished"
        );

        report
    }
}
