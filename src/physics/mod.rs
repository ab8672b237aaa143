//! Physical-unit conversions.

pub mod stokes_einstein;
