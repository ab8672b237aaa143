//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - plate inputs (`RawPlateMatrix`, `PlateConditions`, `PipelineConfig`)
//! - per-curve results (`Profile`, `GaussianFit`, `FitRecord`)
//! - plate results (`ReadTable`, `PlateResults`, `CellIssue`)

pub mod types;

pub use types::*;
