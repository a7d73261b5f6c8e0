//! Simulation models and binary targets.
//!
//! Contains models of the system under test that can be used both in
//! `#[test]` integration tests and in standalone binary targets.

pub mod cluster;
