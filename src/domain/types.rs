//! Shared domain types.
//!
//! Every stage of the pipeline passes small immutable value structs around:
//!
//! - inputs: `RawPlateMatrix`, `PlateConditions`, `PipelineConfig`
//! - per-curve outputs: `Profile`, `GaussianFit`, `FitRecord`
//! - plate outputs: `ReadTable<T>` (read × column) bundled into `PlateResults`
//!
//! They are serializable so a run can be written to JSON and reloaded later.

use std::collections::BTreeMap;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::PlateError;

/// Samples per curve (one per capillary position letter A..P).
pub const CURVE_LEN: usize = 16;

/// Peak index reported for a curve with no signal.
pub const EMPTY_PEAK_INDEX: usize = 5;

/// Minimum number of samples between the peak and the end of the curve.
pub const MIN_CURVE_SPAN: usize = 4;

/// Largest end index a profile may report (beyond it lies the capillary end).
pub const MAX_END_INDEX: usize = 11;

/// Distance between two neighbouring capillary samples, meters.
pub const DEFAULT_SPACING_M: f64 = 4.5e-3;

/// Default optimizer budget (residual evaluations) per curve fit.
pub const DEFAULT_MAX_EVALUATIONS: usize = 2000;

/// How per-cell profiles are turned into the profiles used for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfilingMethod {
    /// Profile the mean curve of each column once and use it for every read.
    Average,
    /// Profile every (read, column) curve on its own.
    #[default]
    Individual,
    /// Profile every curve, then use the most frequent peak and end per column.
    Consensus,
}

impl ProfilingMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            ProfilingMethod::Average => "average",
            ProfilingMethod::Individual => "individual",
            ProfilingMethod::Consensus => "consensus",
        }
    }
}

impl FromStr for ProfilingMethod {
    type Err = PlateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" => Ok(ProfilingMethod::Average),
            "individual" => Ok(ProfilingMethod::Individual),
            "consensus" => Ok(ProfilingMethod::Consensus),
            other => Err(PlateError::config(format!(
                "Unknown profiling method '{other}' (expected average, individual or consensus)."
            ))),
        }
    }
}

/// Which plate columns are processed.
///
/// Column numbers are 1-based, the way they are printed on the plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSelection {
    #[default]
    All,
    /// Only these columns. An empty list means every column.
    Include(Vec<usize>),
    /// Every column except these.
    Exclude(Vec<usize>),
}

impl ColumnSelection {
    /// Resolve to 0-based column indices in plate order.
    pub fn resolve(&self, num_columns: usize) -> Result<Vec<usize>, PlateError> {
        let check = |numbers: &[usize]| -> Result<(), PlateError> {
            if let Some(bad) = numbers.iter().find(|&&n| n == 0 || n > num_columns) {
                return Err(PlateError::config(format!(
                    "Column {bad} does not exist (plate has columns 1..={num_columns})."
                )));
            }
            Ok(())
        };

        let selected: Vec<usize> = match self {
            ColumnSelection::All => (0..num_columns).collect(),
            ColumnSelection::Include(numbers) if numbers.is_empty() => (0..num_columns).collect(),
            ColumnSelection::Include(numbers) => {
                check(numbers)?;
                (0..num_columns).filter(|i| numbers.contains(&(i + 1))).collect()
            }
            ColumnSelection::Exclude(numbers) => {
                check(numbers)?;
                (0..num_columns).filter(|i| !numbers.contains(&(i + 1))).collect()
            }
        };

        if selected.is_empty() {
            return Err(PlateError::config("Column selection leaves no columns to process."));
        }
        Ok(selected)
    }
}

/// Pipeline configuration (all knobs are explicit; there is no global state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub method: ProfilingMethod,
    /// Capillary sample spacing, meters.
    pub spacing_m: f64,
    /// Optimizer budget per curve fit.
    pub max_evaluations: usize,
    pub columns: ColumnSelection,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            method: ProfilingMethod::default(),
            spacing_m: DEFAULT_SPACING_M,
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            columns: ColumnSelection::All,
        }
    }
}

impl PipelineConfig {
    pub fn with_method(method: ProfilingMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PlateError> {
        if !(self.spacing_m.is_finite() && self.spacing_m > 0.0) {
            return Err(PlateError::config(format!(
                "Invalid sample spacing {} m (must be finite and > 0).",
                self.spacing_m
            )));
        }
        if self.max_evaluations == 0 {
            return Err(PlateError::config("Optimizer evaluation budget must be > 0."));
        }
        Ok(())
    }
}

/// Raw fluorescence plate: `CURVE_LEN × num_reads` rows by `num_columns` columns.
///
/// Stored column-major; read `r` of a column is the contiguous block
/// `r * CURVE_LEN .. (r + 1) * CURVE_LEN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlateMatrix {
    column_names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl RawPlateMatrix {
    /// Build from named columns, validating the plate shape.
    pub fn new(column_names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self, PlateError> {
        let matrix = Self {
            column_names,
            columns,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Build from row-major data (`rows[row][column]`), as instruments print it.
    pub fn from_rows(column_names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, PlateError> {
        let n_cols = column_names.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); n_cols];
        for (line, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(PlateError::shape(format!(
                    "Row {line} has {} values, expected {n_cols}.",
                    row.len()
                )));
            }
            for (col, &v) in row.iter().enumerate() {
                columns[col].push(v);
            }
        }
        Self::new(column_names, columns)
    }

    /// Check the structural invariants (also used after deserialization).
    pub fn validate(&self) -> Result<(), PlateError> {
        if self.column_names.len() != self.columns.len() {
            return Err(PlateError::shape(format!(
                "{} column names for {} data columns.",
                self.column_names.len(),
                self.columns.len()
            )));
        }
        if self.columns.is_empty() {
            return Err(PlateError::shape("Plate has no columns."));
        }
        let rows = self.columns[0].len();
        if rows == 0 || rows % CURVE_LEN != 0 {
            return Err(PlateError::shape(format!(
                "Row count {rows} is not a positive multiple of {CURVE_LEN}."
            )));
        }
        for (name, col) in self.column_names.iter().zip(&self.columns) {
            if col.len() != rows {
                return Err(PlateError::shape(format!(
                    "Column '{name}' has {} rows, expected {rows}.",
                    col.len()
                )));
            }
            if let Some(pos) = col.iter().position(|v| !v.is_finite()) {
                return Err(PlateError::shape(format!(
                    "Column '{name}' row {pos} is not a finite number."
                )));
            }
        }
        for (i, name) in self.column_names.iter().enumerate() {
            if self.column_names[..i].contains(name) {
                return Err(PlateError::shape(format!("Duplicate column name '{name}'.")));
            }
        }
        Ok(())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_reads(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len() / CURVE_LEN)
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|n| n == name)
    }

    /// The curve of one (read, column) cell.
    ///
    /// # Panics
    /// Panics if `read` or `column` is out of range.
    pub fn curve(&self, read: usize, column: usize) -> &[f64] {
        let start = read * CURVE_LEN;
        &self.columns[column][start..start + CURVE_LEN]
    }
}

/// Experimental conditions of one plate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateConditions {
    /// Minutes between two reads.
    pub interval_minutes: f64,
    /// Minutes between the end of loading and the first read.
    pub delay_minutes: f64,
    /// Minutes taken to load each capillary.
    pub load_rate_minutes: f64,
    pub temperature_k: f64,
    /// Probe radius per column name, nanometers.
    pub radii_nm: BTreeMap<String, f64>,
}

impl PlateConditions {
    /// Conditions with the same probe radius in every named column.
    pub fn with_uniform_radius(
        column_names: &[String],
        radius_nm: f64,
        interval_minutes: f64,
        delay_minutes: f64,
        load_rate_minutes: f64,
        temperature_k: f64,
    ) -> Self {
        Self {
            interval_minutes,
            delay_minutes,
            load_rate_minutes,
            temperature_k,
            radii_nm: column_names.iter().map(|n| (n.clone(), radius_nm)).collect(),
        }
    }

    /// Replace the radius table by a per-column list, in plate order.
    pub fn set_radii(&mut self, column_names: &[String], radii_nm: &[f64]) -> Result<(), PlateError> {
        if radii_nm.len() != column_names.len() {
            return Err(PlateError::shape(format!(
                "{} radii given for {} columns.",
                radii_nm.len(),
                column_names.len()
            )));
        }
        self.radii_nm = column_names
            .iter()
            .cloned()
            .zip(radii_nm.iter().copied())
            .collect();
        Ok(())
    }

    pub fn radius_nm(&self, column: &str) -> Option<f64> {
        self.radii_nm.get(column).copied()
    }

    /// Validate the scalar conditions and the radius of every selected column.
    pub fn validate(&self, matrix: &RawPlateMatrix, selected: &[usize]) -> Result<(), PlateError> {
        if !(self.interval_minutes.is_finite() && self.interval_minutes > 0.0) {
            return Err(PlateError::config(format!(
                "Read interval must be > 0 minutes (got {}).",
                self.interval_minutes
            )));
        }
        if !(self.delay_minutes.is_finite() && self.delay_minutes >= 0.0) {
            return Err(PlateError::config(format!(
                "Delay must be >= 0 minutes (got {}).",
                self.delay_minutes
            )));
        }
        if !(self.load_rate_minutes.is_finite() && self.load_rate_minutes >= 0.0) {
            return Err(PlateError::config(format!(
                "Load rate must be >= 0 minutes (got {}).",
                self.load_rate_minutes
            )));
        }
        if !(self.temperature_k.is_finite() && self.temperature_k > 0.0) {
            return Err(PlateError::config(format!(
                "Temperature must be > 0 K (got {}).",
                self.temperature_k
            )));
        }

        for &col in selected {
            let name = &matrix.column_names()[col];
            let Some(radius) = self.radius_nm(name) else {
                return Err(PlateError::shape(format!("No probe radius given for column '{name}'.")));
            };
            if !(radius.is_finite() && radius > 0.0) {
                return Err(PlateError::config(format!(
                    "Probe radius for column '{name}' must be > 0 nm (got {radius})."
                )));
            }
        }
        Ok(())
    }

    /// Seconds since loading for a read, given the column's processing position.
    ///
    /// Later columns start measuring later because capillaries are loaded one
    /// after another.
    pub fn elapsed_seconds(&self, read: usize, column_position: usize) -> f64 {
        let minutes = read as f64 * self.interval_minutes
            + column_position as f64 * self.load_rate_minutes
            + self.delay_minutes;
        minutes * 60.0
    }
}

/// Peak and end location of the diffusion Gaussian in one curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    pub peak_index: usize,
    pub end_index: usize,
}

impl Profile {
    /// Build a profile with the end clamped to `[peak + MIN_CURVE_SPAN, MAX_END_INDEX]`.
    pub fn clamped(peak_index: usize, raw_end: usize) -> Self {
        let end_index = raw_end.min(MAX_END_INDEX).max(peak_index + MIN_CURVE_SPAN);
        Self {
            peak_index,
            end_index,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.peak_index == EMPTY_PEAK_INDEX
    }
}

/// A read × column table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadTable<T> {
    column_names: Vec<String>,
    rows: Vec<Vec<T>>,
}

impl<T> ReadTable<T> {
    /// Build a table by evaluating `f(read, column_position)` for every cell.
    pub fn from_fn(num_reads: usize, column_names: Vec<String>, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let n_cols = column_names.len();
        let mut rows = Vec::with_capacity(num_reads);
        for read in 0..num_reads {
            let mut row = Vec::with_capacity(n_cols);
            for col in 0..n_cols {
                row.push(f(read, col));
            }
            rows.push(row);
        }
        Self { column_names, rows }
    }

    /// Build from row vectors; every row must have one value per column.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<T>>) -> Result<Self, PlateError> {
        if let Some(bad) = rows.iter().position(|r| r.len() != column_names.len()) {
            return Err(PlateError::shape(format!(
                "Table row {bad} has {} cells, expected {}.",
                rows[bad].len(),
                column_names.len()
            )));
        }
        Ok(Self { column_names, rows })
    }

    pub fn num_reads(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.column_names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|n| n == name)
    }

    pub fn get(&self, read: usize, column: usize) -> Option<&T> {
        self.rows.get(read).and_then(|r| r.get(column))
    }

    pub fn row(&self, read: usize) -> Option<&[T]> {
        self.rows.get(read).map(Vec::as_slice)
    }

    /// All cells of one column, in read order.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &T> + '_ {
        self.rows.iter().filter_map(move |r| r.get(column))
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> ReadTable<U> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for r in &self.rows {
            rows.push(r.iter().map(&mut f).collect());
        }
        ReadTable {
            column_names: self.column_names.clone(),
            rows,
        }
    }
}

/// Raw output of the constrained Gaussian fit of one cleaned curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianFit {
    pub amplitude: f64,
    /// Gaussian variance term, m².
    pub dt_m2: f64,
    pub nrmse: f64,
}

/// Per-cell result after unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitRecord {
    pub amplitude: f64,
    pub dt_m2: f64,
    /// Diffusion coefficient, m²/s.
    pub d_m2s: f64,
    /// Viscosity, mPa·s.
    pub eta_mpas: f64,
    pub nrmse: f64,
}

/// Why a cell has no fit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellIssueKind {
    /// The capillary carries no signal.
    EmptyCurve,
    /// The optimizer ran out of evaluations.
    NonConvergence,
    /// The fit produced non-finite values (or had nothing to fit).
    NonFinite,
}

impl CellIssueKind {
    pub fn display_name(self) -> &'static str {
        match self {
            CellIssueKind::EmptyCurve => "empty curve",
            CellIssueKind::NonConvergence => "fit did not converge",
            CellIssueKind::NonFinite => "non-finite fit",
        }
    }
}

/// A single-cell failure that was absorbed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellIssue {
    pub read: usize,
    pub column: String,
    pub kind: CellIssueKind,
}

/// Everything one pipeline run produces. Tables are always full-shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateResults {
    pub method: ProfilingMethod,
    pub peaks: ReadTable<usize>,
    pub ends: ReadTable<usize>,
    /// `None` marks a missing cell (see `issues`).
    pub fits: ReadTable<Option<FitRecord>>,
    pub issues: Vec<CellIssue>,
}

impl PlateResults {
    pub fn num_reads(&self) -> usize {
        self.fits.num_reads()
    }

    pub fn column_names(&self) -> &[String] {
        self.fits.column_names()
    }

    pub fn total_cells(&self) -> usize {
        self.fits.num_reads() * self.fits.num_columns()
    }

    pub fn successful_fits(&self) -> usize {
        (0..self.fits.num_columns())
            .map(|c| self.fits.column(c).filter(|f| f.is_some()).count())
            .sum()
    }

    pub fn profile(&self, read: usize, column: usize) -> Option<Profile> {
        let peak_index = *self.peaks.get(read, column)?;
        let end_index = *self.ends.get(read, column)?;
        Some(Profile {
            peak_index,
            end_index,
        })
    }
}
