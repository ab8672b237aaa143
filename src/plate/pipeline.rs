//! PlatePipeline: profile → clean → fit → convert, for every (read, column).
//!
//! The run is a pure function of `(matrix, conditions, config)`:
//!
//! 1. validate the configuration, the plate shape and the conditions
//! 2. normalize every selected curve
//! 3. profile according to the method (average / individual / consensus)
//! 4. clean, fit and convert every cell in parallel
//!
//! Cells are independent once profiles are fixed, so step 4 runs on rayon and
//! collects in input order; the result equals a sequential pass.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::domain::{
    CellIssue, CellIssueKind, FitRecord, PipelineConfig, PlateConditions, PlateResults, Profile,
    ProfilingMethod, RawPlateMatrix, ReadTable,
};
use crate::error::PlateError;
use crate::fit::{fit_one_curve, to_fit_record};
use crate::plate::consensus::consensus_profiles;
use crate::profile::normalize::{average_curves, normalize_plate};
use crate::profile::{clean_one_curve, profile_one_curve};

/// Reusable pipeline bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct PlatePipeline {
    config: PipelineConfig,
}

impl PlatePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a whole plate.
    ///
    /// Only structural and configuration problems are errors. Single-cell
    /// failures leave a `None` in `fits` plus an entry in `issues`.
    pub fn run(&self, matrix: &RawPlateMatrix, conditions: &PlateConditions) -> Result<PlateResults, PlateError> {
        let plan = RunPlan::prepare(&self.config, matrix, conditions)?;
        let num_reads = matrix.num_reads();
        let n_cols = plan.columns.len();

        info!(
            "plate: {num_reads} reads x {n_cols} columns, method {}",
            self.config.method.display_name()
        );

        let normalized = normalize_plate(matrix, &plan.columns);
        let profiles = match self.config.method {
            ProfilingMethod::Average => {
                let averages = average_curves(&normalized, n_cols);
                let per_column: Vec<Profile> = averages.par_iter().map(|c| profile_one_curve(c)).collect();
                vec![per_column; num_reads]
            }
            ProfilingMethod::Individual => profile_cells(&normalized),
            ProfilingMethod::Consensus => consensus_profiles(&profile_cells(&normalized)),
        };

        let cells: Vec<(usize, usize)> = (0..num_reads)
            .flat_map(|read| (0..n_cols).map(move |pos| (read, pos)))
            .collect();
        let outcomes: Vec<Result<FitRecord, CellIssueKind>> = cells
            .par_iter()
            .map(|&(read, pos)| {
                let raw = matrix.curve(read, plan.columns[pos]);
                fit_cell(&self.config, conditions, raw, profiles[read][pos], read, pos, plan.radii_nm[pos])
            })
            .collect();

        let mut issues = Vec::new();
        for (&(read, pos), outcome) in cells.iter().zip(&outcomes) {
            if let Err(kind) = outcome {
                let column = plan.names[pos].clone();
                debug!("read {read}, column '{column}': {}", kind.display_name());
                issues.push(CellIssue {
                    read,
                    column,
                    kind: *kind,
                });
            }
        }

        let peaks = ReadTable::from_fn(num_reads, plan.names.clone(), |r, p| profiles[r][p].peak_index);
        let ends = ReadTable::from_fn(num_reads, plan.names.clone(), |r, p| profiles[r][p].end_index);
        let fits = ReadTable::from_fn(num_reads, plan.names, |r, p| outcomes[r * n_cols + p].ok());

        let results = PlateResults {
            method: self.config.method,
            peaks,
            ends,
            fits,
            issues,
        };

        let ok = results.successful_fits();
        if ok == 0 {
            warn!("no successful fits in {} cells", results.total_cells());
        } else {
            info!("{ok}/{} cells fitted", results.total_cells());
        }
        Ok(results)
    }
}

/// Run the pipeline once with an explicit configuration.
pub fn run_plate(
    matrix: &RawPlateMatrix,
    conditions: &PlateConditions,
    config: &PipelineConfig,
) -> Result<PlateResults, PlateError> {
    PlatePipeline::new(config.clone()).run(matrix, conditions)
}

/// Validated inputs resolved to processing order.
struct RunPlan {
    /// Plate column indices, in processing order.
    columns: Vec<usize>,
    names: Vec<String>,
    radii_nm: Vec<f64>,
}

impl RunPlan {
    fn prepare(
        config: &PipelineConfig,
        matrix: &RawPlateMatrix,
        conditions: &PlateConditions,
    ) -> Result<Self, PlateError> {
        config.validate()?;
        matrix.validate()?;
        let columns = config.columns.resolve(matrix.num_columns())?;
        conditions.validate(matrix, &columns)?;

        let names: Vec<String> = columns.iter().map(|&c| matrix.column_names()[c].clone()).collect();
        let radii_nm = names
            .iter()
            .map(|n| {
                conditions
                    .radius_nm(n)
                    .ok_or_else(|| PlateError::shape(format!("No probe radius given for column '{n}'.")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            columns,
            names,
            radii_nm,
        })
    }
}

fn profile_cells(normalized: &[Vec<Vec<f64>>]) -> Vec<Vec<Profile>> {
    normalized
        .par_iter()
        .map(|read| read.iter().map(|c| profile_one_curve(c)).collect())
        .collect()
}

fn fit_cell(
    config: &PipelineConfig,
    conditions: &PlateConditions,
    raw: &[f64],
    profile: Profile,
    read: usize,
    position: usize,
    radius_nm: f64,
) -> Result<FitRecord, CellIssueKind> {
    if profile.is_empty() || !raw.iter().any(|&v| v > 0.0) {
        return Err(CellIssueKind::EmptyCurve);
    }

    let cleaned = clean_one_curve(raw, profile.peak_index);
    let fit = fit_one_curve(&cleaned, profile.end_index, config.spacing_m, config.max_evaluations)
        .map_err(|f| f.issue_kind())?;

    let elapsed = conditions.elapsed_seconds(read, position);
    let record = to_fit_record(&fit, elapsed, conditions.temperature_k, radius_nm);
    if !(record.d_m2s.is_finite() && record.eta_mpas.is_finite()) {
        return Err(CellIssueKind::NonFinite);
    }
    Ok(record)
}
