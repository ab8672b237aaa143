//! Group report: per-column means summarized over named column groups.

use serde::Serialize;

use crate::analysis::outliers::remove_outliers;
use crate::analysis::stats::{extract_statistic, ReadWindow, ResultTable, Statistic};
use crate::domain::PlateResults;
use crate::error::PlateError;
use crate::math::stats::{mean, median, sample_std};

/// Named set of result columns reported together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnGroup {
    pub name: String,
    pub columns: Vec<String>,
}

impl ColumnGroup {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub column: String,
    pub eta_mpas: f64,
    pub d_m2s: f64,
    /// The column's η is an outlier within its group.
    pub outlier: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupSummary {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl GroupSummary {
    fn of(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        Self {
            mean: mean(&finite),
            median: median(&finite),
            std_dev: sample_std(&finite),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub entries: Vec<GroupEntry>,
    /// Summaries without the flagged outliers.
    pub eta: GroupSummary,
    pub d: GroupSummary,
    /// Summaries over every column of the group.
    pub eta_raw: GroupSummary,
    pub d_raw: GroupSummary,
}

/// Build one report per group from the window mean η and D of each column.
///
/// Outliers are detected on η; the column is then excluded from both the η
/// and the D summaries.
pub fn build_group_reports(
    results: &PlateResults,
    groups: &[ColumnGroup],
    window: ReadWindow,
    interval_minutes: f64,
) -> Result<Vec<GroupReport>, PlateError> {
    groups
        .iter()
        .map(|group| {
            if group.columns.is_empty() {
                return Err(PlateError::config(format!("Group '{}' has no columns.", group.name)));
            }

            let mut etas = Vec::with_capacity(group.columns.len());
            let mut ds = Vec::with_capacity(group.columns.len());
            for column in &group.columns {
                let stat = |table| {
                    extract_statistic(results, column, table, Statistic::Mean, window, interval_minutes)
                };
                etas.push(stat(ResultTable::Eta)?);
                ds.push(stat(ResultTable::D)?);
            }

            let split = remove_outliers(&etas);
            let entries: Vec<GroupEntry> = group
                .columns
                .iter()
                .enumerate()
                .map(|(i, column)| GroupEntry {
                    column: column.clone(),
                    eta_mpas: etas[i],
                    d_m2s: ds[i],
                    outlier: split.removed_indices.contains(&i),
                })
                .collect();

            let clean = |values: &[f64]| -> Vec<f64> {
                values
                    .iter()
                    .zip(&entries)
                    .filter(|(_, e)| !e.outlier)
                    .map(|(v, _)| *v)
                    .collect()
            };

            Ok(GroupReport {
                name: group.name.clone(),
                eta: GroupSummary::of(&clean(&etas)),
                d: GroupSummary::of(&clean(&ds)),
                eta_raw: GroupSummary::of(&etas),
                d_raw: GroupSummary::of(&ds),
                entries,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::results_from;
    use crate::domain::FitRecord;

    fn rec(eta: f64) -> Option<FitRecord> {
        Some(FitRecord {
            amplitude: 1.0,
            dt_m2: 1e-6,
            d_m2s: 1e-10 / eta,
            eta_mpas: eta,
            nrmse: 0.01,
        })
    }

    #[test]
    fn outlier_is_flagged_and_excluded() {
        let etas = [1.0, 1.1, 0.9, 1.05, 0.95, 8.0];
        let row: Vec<Option<FitRecord>> = etas.iter().map(|&e| rec(e)).collect();
        let results = results_from(vec![row; 3]);
        let group = ColumnGroup::new("wt", results.column_names().to_vec());

        let reports = build_group_reports(&results, &[group], ReadWindow::All, 15.0).unwrap();
        let r = &reports[0];
        assert_eq!(r.entries.iter().filter(|e| e.outlier).count(), 1);
        assert!(r.entries[5].outlier);
        assert!((r.eta.mean - 1.0).abs() < 1e-12);
        assert!(r.eta_raw.mean > r.eta.mean);
        assert!(r.eta.std_dev.is_finite());
    }

    #[test]
    fn unknown_column_in_group_is_an_error() {
        let results = results_from(vec![vec![rec(1.0)]; 2]);
        let group = ColumnGroup::new("x", vec!["Column 7".to_string()]);
        assert!(build_group_reports(&results, &[group], ReadWindow::All, 15.0).is_err());
        let empty = ColumnGroup::new("y", vec![]);
        assert!(build_group_reports(&results, &[empty], ReadWindow::All, 15.0).is_err());
    }
}
