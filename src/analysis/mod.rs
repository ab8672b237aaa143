//! Post-run analysis of plate results.
//!
//! - per-column statistics over a read window (`stats`)
//! - robust outlier rejection (`outliers`)
//! - probe-radius calibration against known viscosities (`calibrate`)
//! - grouped summaries for reporting (`groups`)

pub mod calibrate;
pub mod groups;
pub mod outliers;
pub mod stats;

pub use calibrate::{calibrate_results, CalibratedResults, RadiusCalibration};
pub use groups::{build_group_reports, ColumnGroup, GroupEntry, GroupReport, GroupSummary};
pub use outliers::{remove_outliers, OutlierSplit};
pub use stats::{extract_statistic, ReadWindow, ResultTable, Statistic};

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::{FitRecord, PlateResults, ProfilingMethod, ReadTable};

    /// Results with `Column 1..=n` built from `[read][column]` fit cells.
    pub fn results_from(fits: Vec<Vec<Option<FitRecord>>>) -> PlateResults {
        let names: Vec<String> = (1..=fits[0].len()).map(|i| format!("Column {i}")).collect();
        let reads = fits.len();
        PlateResults {
            method: ProfilingMethod::Individual,
            peaks: ReadTable::from_fn(reads, names.clone(), |_, _| 1),
            ends: ReadTable::from_fn(reads, names.clone(), |_, _| 6),
            fits: ReadTable::from_rows(names, fits).unwrap(),
            issues: Vec::new(),
        }
    }
}
