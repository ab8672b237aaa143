//! Curve fitting.
//!
//! Responsibilities:
//!
//! - fit the pinned-peak diffusion Gaussian to one cleaned curve
//! - convert the fitted variance term into D and η for a given elapsed time

pub mod fitter;

pub use fitter::*;
