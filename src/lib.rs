//! `diffusion-plate` library crate.
//!
//! The binary (`plate1d`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the per-curve operations can be reused on their own
//! - code stays easy to navigate as the project grows
//!
//! The per-curve chain is `normalize_curve → profile_one_curve →
//! clean_one_curve → fit_one_curve → to_fit_record`; `PlatePipeline` runs it
//! over every (read, column) cell of a plate.

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod physics;
pub mod plate;
pub mod profile;
pub mod report;

pub use error::{AppError, PlateError};
pub use fit::{fit_one_curve, to_fit_record};
pub use plate::{run_plate, PlatePipeline};
pub use profile::{clean_one_curve, normalize_curve, profile_one_curve};
