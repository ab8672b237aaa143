//! Shared "run" workflow used by the `run` command.
//!
//! Keeping this in one place keeps the command handler about presentation:
//! load document -> apply overrides -> pipeline -> calibration -> group reports

use std::collections::BTreeMap;

use crate::analysis::{
    build_group_reports, calibrate_results, extract_statistic, CalibratedResults, ColumnGroup,
    GroupReport, ReadWindow,
};
use crate::cli::RunArgs;
use crate::domain::{ColumnSelection, PipelineConfig, PlateConditions, PlateResults};
use crate::error::{AppError, PlateError};
use crate::io::{read_plate_document, PlateDocument};
use crate::plate::PlatePipeline;

/// All computed outputs of a single `plate1d run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub document: PlateDocument,
    pub config: PipelineConfig,
    pub results: PlateResults,
    /// `(column, value)` of the requested statistic, in processing order.
    pub statistics: Vec<(String, f64)>,
    pub calibration: Option<CalibratedResults>,
    pub groups: Vec<GroupReport>,
}

/// Execute the full run and return the computed outputs.
pub fn run_document(args: &RunArgs) -> Result<RunOutput, AppError> {
    let mut document = read_plate_document(&args.input)?;
    apply_condition_overrides(&mut document, args)?;
    run_loaded(document, args)
}

/// Execute the run on an already loaded (and overridden) document.
pub fn run_loaded(document: PlateDocument, args: &RunArgs) -> Result<RunOutput, AppError> {
    let config = pipeline_config_from_args(args);
    let results = PlatePipeline::new(config.clone()).run(&document.matrix, &document.conditions)?;

    let window = match args.end_hours {
        Some(hours) => ReadWindow::TrailingHours(hours),
        None => ReadWindow::All,
    };

    let interval = document.conditions.interval_minutes;
    let statistics = match args.stat {
        Some(stat) => results
            .column_names()
            .iter()
            .map(|name| {
                let v = extract_statistic(&results, name, args.table, stat, window, interval)?;
                Ok((name.clone(), v))
            })
            .collect::<Result<Vec<_>, PlateError>>()?,
        None => Vec::new(),
    };

    let calibration = if args.calibrators.is_empty() {
        None
    } else {
        let calibrators = calibrators_by_name(&document, &results, &args.calibrators)?;
        Some(calibrate_results(&results, &document.conditions, &calibrators, window)?)
    };

    let groups: Vec<ColumnGroup> = args
        .groups
        .iter()
        .map(|(name, cols)| {
            let columns = cols
                .iter()
                .map(|&n| processed_column_name(&document, &results, n))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ColumnGroup::new(name.clone(), columns))
        })
        .collect::<Result<_, PlateError>>()?;
    let groups = build_group_reports(&results, &groups, window, interval)?;

    Ok(RunOutput {
        document,
        config,
        results,
        statistics,
        calibration,
        groups,
    })
}

pub fn pipeline_config_from_args(args: &RunArgs) -> PipelineConfig {
    let columns = if !args.columns.is_empty() {
        ColumnSelection::Include(args.columns.clone())
    } else if !args.exclude.is_empty() {
        ColumnSelection::Exclude(args.exclude.clone())
    } else {
        ColumnSelection::All
    };

    PipelineConfig {
        method: args.method,
        spacing_m: args.spacing_m,
        max_evaluations: args.max_evals,
        columns,
    }
}

/// Replace document conditions by the values given on the command line.
pub fn apply_condition_overrides(document: &mut PlateDocument, args: &RunArgs) -> Result<(), PlateError> {
    let names = document.matrix.column_names().to_vec();
    let c: &mut PlateConditions = &mut document.conditions;

    if let Some(v) = args.interval {
        c.interval_minutes = v;
    }
    if let Some(v) = args.delay {
        c.delay_minutes = v;
    }
    if let Some(v) = args.load_rate {
        c.load_rate_minutes = v;
    }
    if let Some(v) = args.temperature {
        c.temperature_k = v;
    }
    if let Some(r) = args.radius {
        c.set_radii(&names, &vec![r; names.len()])?;
    } else if !args.radii.is_empty() {
        c.set_radii(&names, &args.radii)?;
    }
    Ok(())
}

/// Name of 1-based plate column `number`, which must have been processed.
fn processed_column_name(
    document: &PlateDocument,
    results: &PlateResults,
    number: usize,
) -> Result<String, PlateError> {
    let name = number
        .checked_sub(1)
        .and_then(|i| document.matrix.column_names().get(i))
        .ok_or_else(|| PlateError::config(format!("Column {number} does not exist.")))?;
    if !results.column_names().contains(name) {
        return Err(PlateError::config(format!("Column {number} ('{name}') was not processed.")));
    }
    Ok(name.clone())
}

fn calibrators_by_name(
    document: &PlateDocument,
    results: &PlateResults,
    calibrators: &[(usize, f64)],
) -> Result<BTreeMap<String, f64>, PlateError> {
    calibrators
        .iter()
        .map(|&(col, eta)| Ok((processed_column_name(document, results, col)?, eta)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Command};
    use crate::data::{generate_plate, SyntheticPlateSpec};

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["plate1d", "run", "plate.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn overrides_replace_document_conditions() {
        let mut doc = generate_plate(&SyntheticPlateSpec::default()).unwrap();
        let args = run_args(&["--interval", "10", "--temperature", "300", "--radii", "1,2,3"]);
        apply_condition_overrides(&mut doc, &args).unwrap();
        assert_eq!(doc.conditions.interval_minutes, 10.0);
        assert_eq!(doc.conditions.temperature_k, 300.0);
        assert_eq!(doc.conditions.radius_nm("Column 3"), Some(3.0));

        let wrong = run_args(&["--radii", "1,2"]);
        assert!(apply_condition_overrides(&mut doc, &wrong).is_err());
    }

    #[test]
    fn groups_refer_to_plate_column_numbers() {
        let doc = generate_plate(&SyntheticPlateSpec::default()).unwrap();
        let args = run_args(&["--columns", "2,3", "--group", "g=3"]);
        let out = run_loaded(doc.clone(), &args).unwrap();
        assert_eq!(out.groups[0].entries[0].column, "Column 3");

        let unprocessed = run_args(&["--columns", "2,3", "--group", "g=1"]);
        assert!(run_loaded(doc, &unprocessed).is_err());
    }

    #[test]
    fn statistic_is_reported_per_processed_column() {
        let doc = generate_plate(&SyntheticPlateSpec::default()).unwrap();
        let args = run_args(&["--stat", "median", "--table", "nrmse", "--exclude", "1"]);
        let out = run_loaded(doc, &args).unwrap();
        let columns: Vec<&str> = out.statistics.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, vec!["Column 2", "Column 3"]);

        let too_long = run_args(&["--stat", "mean", "--end-hours", "100"]);
        let doc = generate_plate(&SyntheticPlateSpec::default()).unwrap();
        assert!(run_loaded(doc, &too_long).is_err());
    }
}
