//! Deterministic randomness shared by the random choice strategy and seed
//! builders.

pub mod rng;

pub use rng::{
    get_current_sim_seed, get_rng_call_count, reset_sim_rng, set_sim_seed, sim_random,
    sim_random_range, sim_random_range_or_default,
};
