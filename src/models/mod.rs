//! Gaussian model implementations.
//!
//! Models are small pure functions so that the profiler and the fitter can
//! share them.

pub mod model;

pub use model::*;
