//! Thread-local random number generation for exploration.
//!
//! Deterministic randomness lives in thread-local storage so the random
//! choice strategy and the seed builders can draw values without threading an
//! RNG through every call. Each thread owns its own generator, which keeps
//! parallel test threads independent while a given seed always replays the
//! same sequence.

use std::cell::{Cell, RefCell};

use rand::distr::uniform::SampleUniform;
use rand::distr::{Distribution, StandardUniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

thread_local! {
    /// Thread-local generator, ChaCha8 for reproducibility.
    static SIM_RNG: RefCell<ChaCha8Rng> = RefCell::new(ChaCha8Rng::seed_from_u64(0));

    /// Seed last set via [`set_sim_seed`], kept for error reporting.
    static CURRENT_SEED: Cell<u64> = const { Cell::new(0) };

    /// Number of samples drawn since the last reset.
    static RNG_CALL_COUNT: Cell<u64> = const { Cell::new(0) };
}

fn pre_sample() {
    RNG_CALL_COUNT.with(|c| c.set(c.get() + 1));
}

/// Generate a random value using the thread-local RNG.
pub fn sim_random<T>() -> T
where
    StandardUniform: Distribution<T>,
{
    pre_sample();
    SIM_RNG.with(|rng| rng.borrow_mut().sample(StandardUniform))
}

/// Generate a random value within `range` (exclusive upper bound).
///
/// The range must not be empty; see [`sim_random_range_or_default`].
pub fn sim_random_range<T>(range: std::ops::Range<T>) -> T
where
    T: SampleUniform + PartialOrd,
{
    pre_sample();
    SIM_RNG.with(|rng| rng.borrow_mut().random_range(range))
}

/// Like [`sim_random_range`], returning the start value if the range is empty.
pub fn sim_random_range_or_default<T>(range: std::ops::Range<T>) -> T
where
    T: SampleUniform + PartialOrd + Clone,
{
    if range.start >= range.end {
        range.start
    } else {
        sim_random_range(range)
    }
}

/// Seed the thread-local RNG.
pub fn set_sim_seed(seed: u64) {
    SIM_RNG.with(|rng| {
        *rng.borrow_mut() = ChaCha8Rng::seed_from_u64(seed);
    });
    CURRENT_SEED.with(|s| s.set(seed));
    RNG_CALL_COUNT.with(|c| c.set(0));
}

/// The seed last set via [`set_sim_seed`], or 0.
pub fn get_current_sim_seed() -> u64 {
    CURRENT_SEED.with(|s| s.get())
}

/// Samples drawn since the RNG was last seeded or reset.
pub fn get_rng_call_count() -> u64 {
    RNG_CALL_COUNT.with(|c| c.get())
}

/// Reset the thread-local RNG to its initial state.
pub fn reset_sim_rng() {
    set_sim_seed(0);
}
