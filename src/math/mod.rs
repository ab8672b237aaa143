//! Numerical utilities: least squares, bounded Levenberg–Marquardt, signal
//! helpers and statistics.

pub mod lm;
pub mod ols;
pub mod signal;
pub mod stats;

pub use lm::{minimize_bounded, Bounds, LmFailure, LmOptions, LmReport};
pub use ols::*;
