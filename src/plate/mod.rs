//! Whole-plate orchestration.

pub mod consensus;
pub mod pipeline;

pub use pipeline::{run_plate, PlatePipeline};
