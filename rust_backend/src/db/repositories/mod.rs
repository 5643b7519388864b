//! Repository implementations module.
//!
//! - `local`: In-memory implementation for tests, benchmarks and night simulations

pub mod local;

pub use local::LocalRepository;
