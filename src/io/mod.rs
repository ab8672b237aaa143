//! Input/output helpers.
//!
//! - plate JSON documents and result JSON (`plate`)
//! - result exports to CSV (`export`)

pub mod export;
pub mod plate;

pub use export::*;
pub use plate::*;
