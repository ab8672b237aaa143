//! Reporting utilities: terminal summaries of runs, groups and calibrations.

pub mod format;

pub use format::{
    format_calibration, format_curve_preview, format_group_reports, format_run_summary, format_statistics,
};
