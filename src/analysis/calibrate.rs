//! Probe-radius calibration against columns of known viscosity.
//!
//! 1. for every calibration column, take the mean D over the trailing window
//!    and solve Stokes–Einstein for the radius that reproduces the known η
//! 2. group those radii by the column's nominal radius, drop outliers and
//!    average them into one calibrated radius per nominal radius
//! 3. recompute η (from D) and D (from η) for every column whose nominal
//!    radius has a calibrated counterpart

use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;

use crate::analysis::outliers::remove_outliers;
use crate::analysis::stats::{extract_statistic, ReadWindow, ResultTable, Statistic};
use crate::domain::{PlateConditions, PlateResults, ReadTable};
use crate::error::PlateError;
use crate::math::stats::mean;
use crate::physics::stokes_einstein::{diffusion_coefficient, radius, viscosity};

/// Calibrated radius for one nominal radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiusCalibration {
    pub nominal_nm: f64,
    pub calibrated_nm: f64,
    /// Per-column radius estimates that were averaged.
    pub estimates_nm: Vec<f64>,
    /// Estimates rejected as outliers.
    pub rejected_nm: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibratedResults {
    pub radii: Vec<RadiusCalibration>,
    /// `None` for missing cells and uncalibrated columns.
    pub eta_mpas: ReadTable<Option<f64>>,
    pub d_m2s: ReadTable<Option<f64>>,
    /// Columns whose nominal radius has no calibration column.
    pub uncalibrated_columns: Vec<String>,
}

impl CalibratedResults {
    pub fn calibrated_radius(&self, nominal_nm: f64) -> Option<f64> {
        self.radii
            .iter()
            .find(|r| r.nominal_nm == nominal_nm)
            .map(|r| r.calibrated_nm)
    }
}

/// Calibrate `results` using `calibrators` (column name → known η in mPa·s).
pub fn calibrate_results(
    results: &PlateResults,
    conditions: &PlateConditions,
    calibrators: &BTreeMap<String, f64>,
    window: ReadWindow,
) -> Result<CalibratedResults, PlateError> {
    if calibrators.is_empty() {
        return Err(PlateError::config("No calibration columns given."));
    }

    let mut estimates: Vec<(f64, Vec<f64>)> = Vec::new();
    for (column, &expected_eta) in calibrators {
        if !(expected_eta.is_finite() && expected_eta > 0.0) {
            return Err(PlateError::config(format!(
                "Known viscosity for calibration column '{column}' must be > 0 (got {expected_eta})."
            )));
        }
        let nominal = nominal_radius(conditions, column)?;
        let mean_d = extract_statistic(
            results,
            column,
            ResultTable::D,
            Statistic::Mean,
            window,
            conditions.interval_minutes,
        )?;
        let estimate = radius(conditions.temperature_k, mean_d, expected_eta);

        match estimates.iter_mut().find(|(r, _)| *r == nominal) {
            Some((_, list)) => list.push(estimate),
            None => estimates.push((nominal, vec![estimate])),
        }
    }

    let radii: Vec<RadiusCalibration> = estimates
        .into_iter()
        .map(|(nominal_nm, estimates_nm)| {
            let split = remove_outliers(&estimates_nm);
            RadiusCalibration {
                nominal_nm,
                calibrated_nm: mean(&split.kept),
                estimates_nm,
                rejected_nm: split.removed,
            }
        })
        .collect();

    let names = results.column_names().to_vec();
    let mut calibrated_by_pos = Vec::with_capacity(names.len());
    let mut uncalibrated_columns = Vec::new();
    for name in &names {
        let nominal = nominal_radius(conditions, name)?;
        let found = radii.iter().find(|r| r.nominal_nm == nominal).map(|r| r.calibrated_nm);
        if found.is_none() {
            uncalibrated_columns.push(name.clone());
        }
        calibrated_by_pos.push(found);
    }
    if !uncalibrated_columns.is_empty() {
        warn!(
            "not calibrated (no calibration column with a matching radius): {}",
            uncalibrated_columns.join(", ")
        );
    }

    let t = conditions.temperature_k;
    let eta_mpas = ReadTable::from_fn(results.num_reads(), names.clone(), |read, pos| {
        let r_cal = calibrated_by_pos[pos]?;
        let rec = results.fits.get(read, pos)?.as_ref()?;
        Some(viscosity(t, rec.d_m2s, r_cal))
    });
    let d_m2s = ReadTable::from_fn(results.num_reads(), names, |read, pos| {
        let r_cal = calibrated_by_pos[pos]?;
        let rec = results.fits.get(read, pos)?.as_ref()?;
        Some(diffusion_coefficient(t, rec.eta_mpas, r_cal))
    });

    Ok(CalibratedResults {
        radii,
        eta_mpas,
        d_m2s,
        uncalibrated_columns,
    })
}

fn nominal_radius(conditions: &PlateConditions, column: &str) -> Result<f64, PlateError> {
    conditions
        .radius_nm(column)
        .ok_or_else(|| PlateError::shape(format!("No probe radius given for column '{column}'.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::results_from;
    use crate::domain::FitRecord;

    const T: f64 = 297.0;

    fn cell(d: f64, r_nominal: f64) -> Option<FitRecord> {
        Some(FitRecord {
            amplitude: 1.0,
            dt_m2: d * 600.0,
            d_m2s: d,
            eta_mpas: viscosity(T, d, r_nominal),
            nrmse: 0.01,
        })
    }

    #[test]
    fn calibrated_radius_reproduces_known_viscosity() {
        // True radius 60 nm, nominal 50 nm; water-like calibrator of 0.9 mPa·s.
        let d_cal = diffusion_coefficient(T, 0.9, 60.0);
        let d_sample = diffusion_coefficient(T, 3.0, 60.0);
        let rows = vec![vec![cell(d_cal, 50.0), cell(d_sample, 50.0)]; 4];
        let results = results_from(rows);
        let names = results.column_names().to_vec();
        let cond = PlateConditions::with_uniform_radius(&names, 50.0, 15.0, 0.0, 1.5, T);

        let calibrators = BTreeMap::from([("Column 1".to_string(), 0.9)]);
        let cal = calibrate_results(&results, &cond, &calibrators, ReadWindow::All).unwrap();

        let r = cal.calibrated_radius(50.0).unwrap();
        assert!((r - 60.0).abs() < 1e-9, "radius {r}");
        let eta = cal.eta_mpas.get(0, 1).copied().flatten().unwrap();
        assert!((eta - 3.0).abs() < 1e-9, "eta {eta}");
        assert!(cal.uncalibrated_columns.is_empty());
    }

    #[test]
    fn columns_without_matching_radius_are_listed() {
        let d = diffusion_coefficient(T, 1.0, 50.0);
        let results = results_from(vec![vec![cell(d, 50.0), cell(d, 100.0)]; 2]);
        let names = results.column_names().to_vec();
        let mut cond = PlateConditions::with_uniform_radius(&names, 50.0, 15.0, 0.0, 1.5, T);
        cond.set_radii(&names, &[50.0, 100.0]).unwrap();

        let calibrators = BTreeMap::from([("Column 1".to_string(), 1.0)]);
        let cal = calibrate_results(&results, &cond, &calibrators, ReadWindow::All).unwrap();
        assert_eq!(cal.uncalibrated_columns, vec!["Column 2".to_string()]);
        assert!(cal.eta_mpas.column(1).all(Option::is_none));
    }

    #[test]
    fn invalid_known_viscosity_is_rejected() {
        let results = results_from(vec![vec![cell(1e-12, 50.0)]; 2]);
        let names = results.column_names().to_vec();
        let cond = PlateConditions::with_uniform_radius(&names, 50.0, 15.0, 0.0, 1.5, T);
        let calibrators = BTreeMap::from([("Column 1".to_string(), 0.0)]);
        assert!(calibrate_results(&results, &cond, &calibrators, ReadWindow::All).is_err());
    }
}
