//! Per-column statistics over result tables.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{FitRecord, PlateResults};
use crate::error::PlateError;
use crate::math::stats;

/// Floor applied to NRMSE before it is inverted into a weight.
const MIN_WEIGHT_NRMSE: f64 = 1e-12;

/// Which per-cell quantity to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResultTable {
    Eta,
    D,
    Dt,
    Nrmse,
    Amplitude,
}

impl ResultTable {
    pub fn value(self, record: &FitRecord) -> f64 {
        match self {
            ResultTable::Eta => record.eta_mpas,
            ResultTable::D => record.d_m2s,
            ResultTable::Dt => record.dt_m2,
            ResultTable::Nrmse => record.nrmse,
            ResultTable::Amplitude => record.amplitude,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ResultTable::Eta => "eta (mPa·s)",
            ResultTable::D => "D (m²/s)",
            ResultTable::Dt => "Dt (m²)",
            ResultTable::Nrmse => "NRMSE",
            ResultTable::Amplitude => "amplitude",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    Median,
    /// Mean weighted by `1 / nrmse`.
    WeightedMean,
    Minimum,
    Maximum,
}

impl Statistic {
    pub fn display_name(self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::WeightedMean => "weighted mean",
            Statistic::Minimum => "minimum",
            Statistic::Maximum => "maximum",
        }
    }
}

/// Which reads a statistic covers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReadWindow {
    #[default]
    All,
    /// Only the last `hours` of the run.
    TrailingHours(f64),
}

impl ReadWindow {
    /// First read index covered by the window.
    ///
    /// A trailing window must be shorter than the run.
    pub fn start_read(self, num_reads: usize, interval_minutes: f64) -> Result<usize, PlateError> {
        match self {
            ReadWindow::All => Ok(0),
            ReadWindow::TrailingHours(hours) => {
                if !(hours.is_finite() && hours >= 0.0) {
                    return Err(PlateError::config(format!("Invalid end window of {hours} hours.")));
                }
                let included = (hours * 60.0 / interval_minutes).floor() as usize;
                if included >= num_reads {
                    return Err(PlateError::config(format!(
                        "End window of {included} reads is not shorter than the run ({num_reads} reads)."
                    )));
                }
                Ok(num_reads - included)
            }
        }
    }
}

/// `(value, nrmse)` of every fitted cell of one column inside the window.
pub fn column_values(
    results: &PlateResults,
    column: &str,
    table: ResultTable,
    window: ReadWindow,
    interval_minutes: f64,
) -> Result<Vec<(f64, f64)>, PlateError> {
    let pos = results
        .fits
        .column_position(column)
        .ok_or_else(|| PlateError::config(format!("Column '{column}' is not part of the results.")))?;
    let start = window.start_read(results.num_reads(), interval_minutes)?;

    Ok(results
        .fits
        .column(pos)
        .skip(start)
        .flatten()
        .map(|rec| (table.value(rec), rec.nrmse))
        .collect())
}

/// One statistic of one result table for one column.
///
/// Missing cells are skipped; a window without fitted cells yields `NaN`.
pub fn extract_statistic(
    results: &PlateResults,
    column: &str,
    table: ResultTable,
    statistic: Statistic,
    window: ReadWindow,
    interval_minutes: f64,
) -> Result<f64, PlateError> {
    let pairs = column_values(results, column, table, window, interval_minutes)?;
    let values: Vec<f64> = pairs.iter().map(|p| p.0).collect();

    Ok(match statistic {
        Statistic::Mean => stats::mean(&values),
        Statistic::Median => stats::median(&values),
        Statistic::WeightedMean => {
            let weights: Vec<f64> = pairs.iter().map(|p| 1.0 / p.1.max(MIN_WEIGHT_NRMSE)).collect();
            stats::weighted_mean(&values, &weights)
        }
        Statistic::Minimum => stats::min(&values),
        Statistic::Maximum => stats::max(&values),
    })
}
