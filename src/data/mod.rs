//! Data sources.
//!
//! - seeded synthetic plates for demos and tests (`synthetic`)

pub mod synthetic;

pub use synthetic::{generate_plate, SyntheticPlateSpec, MAX_PEAK_OFFSET};
