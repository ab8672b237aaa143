//! Command-line parsing for the capillary diffusion plate analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the profiling/fitting code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::analysis::{ResultTable, Statistic};
use crate::domain::{DEFAULT_MAX_EVALUATIONS, DEFAULT_SPACING_M, ProfilingMethod};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "plate1d", version, about = "1D capillary diffusion plate analysis")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides it.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Profile and fit every cell of a plate document, print a summary, and optionally export.
    Run(RunArgs),
    /// Write a seeded synthetic plate document.
    Simulate(SimulateArgs),
    /// Profile, clean and fit a single curve, printing every intermediate.
    Preview(PreviewArgs),
}

/// Options for analyzing a plate document.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Plate document (JSON) with the raw matrix and the conditions.
    #[arg(value_name = "JSON")]
    pub input: PathBuf,

    /// How per-cell profiles are derived.
    #[arg(short = 'm', long, value_enum, default_value_t = ProfilingMethod::Individual)]
    pub method: ProfilingMethod,

    /// Only process these 1-based columns (comma separated).
    #[arg(long, value_delimiter = ',', conflicts_with = "exclude")]
    pub columns: Vec<usize>,

    /// Process every column except these 1-based columns (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<usize>,

    /// Capillary sample spacing (meters).
    #[arg(long, default_value_t = DEFAULT_SPACING_M)]
    pub spacing_m: f64,

    /// Optimizer evaluation budget per curve fit.
    #[arg(long, default_value_t = DEFAULT_MAX_EVALUATIONS)]
    pub max_evals: usize,

    /// Override the read interval (minutes).
    #[arg(long)]
    pub interval: Option<f64>,

    /// Override the delay before the first read (minutes).
    #[arg(long)]
    pub delay: Option<f64>,

    /// Override the per-capillary load rate (minutes).
    #[arg(long)]
    pub load_rate: Option<f64>,

    /// Override the temperature (K).
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Use this probe radius (nm) for every column.
    #[arg(long, conflicts_with = "radii")]
    pub radius: Option<f64>,

    /// Per-column probe radii (nm) in plate order (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub radii: Vec<f64>,

    /// Export the per-cell result table to CSV.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Export the full results (tables and issues) to JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Report a named column group, e.g. `--group wt=1,2,3` (repeatable).
    #[arg(long = "group", value_name = "NAME=COLS", value_parser = parse_group)]
    pub groups: Vec<(String, Vec<usize>)>,

    /// Calibrate radii with a column of known viscosity, e.g. `--calibrate 1=0.89` (repeatable).
    #[arg(long = "calibrate", value_name = "COL=ETA", value_parser = parse_calibrator)]
    pub calibrators: Vec<(usize, f64)>,

    /// Print this statistic of `--table` for every processed column.
    #[arg(long, value_enum)]
    pub stat: Option<Statistic>,

    /// Result table summarized by `--stat`.
    #[arg(long, value_enum, default_value_t = ResultTable::Eta)]
    pub table: ResultTable,

    /// Restrict statistics, groups and calibration to the trailing hours of the run.
    #[arg(long)]
    pub end_hours: Option<f64>,
}

/// Options for generating a synthetic plate.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output plate document (JSON).
    #[arg(short, long, value_name = "JSON")]
    pub output: PathBuf,

    /// Viscosity per column (mPa·s, comma separated).
    #[arg(long, value_delimiter = ',', default_values_t = vec![1.0, 1.5, 2.0])]
    pub etas: Vec<f64>,

    /// 1-based columns left without probe (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub blank: Vec<usize>,

    /// Number of reads.
    #[arg(long, default_value_t = 6)]
    pub reads: usize,

    /// Probe radius (nm).
    #[arg(long, default_value_t = 0.5)]
    pub radius: f64,

    /// Read interval (minutes).
    #[arg(long, default_value_t = 60.0)]
    pub interval: f64,

    /// Delay before the first read (minutes).
    #[arg(long, default_value_t = 240.0)]
    pub delay: f64,

    /// Per-capillary load rate (minutes).
    #[arg(long, default_value_t = 1.5)]
    pub load_rate: f64,

    /// Temperature (K).
    #[arg(long, default_value_t = 297.0)]
    pub temperature: f64,

    /// Samples between the diffusion peak and sample 1.
    #[arg(long, default_value_t = 0)]
    pub peak_offset: usize,

    /// Constant background added to every sample.
    #[arg(long, default_value_t = 0.0)]
    pub background: f64,

    /// Standard deviation of the additive Gaussian noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for previewing a single curve.
#[derive(Debug, Parser, Clone)]
pub struct PreviewArgs {
    /// Curve samples (comma separated).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub curve: Vec<f64>,

    /// Capillary sample spacing (meters).
    #[arg(long, default_value_t = DEFAULT_SPACING_M)]
    pub spacing_m: f64,

    /// Optimizer evaluation budget.
    #[arg(long, default_value_t = DEFAULT_MAX_EVALUATIONS)]
    pub max_evals: usize,

    /// Minutes since loading; when given, D and η are printed too.
    #[arg(long)]
    pub elapsed: Option<f64>,

    /// Temperature (K).
    #[arg(long, default_value_t = 297.0)]
    pub temperature: f64,

    /// Probe radius (nm).
    #[arg(long, default_value_t = 50.0)]
    pub radius: f64,
}

/// Parse `NAME=1,2,3`.
pub fn parse_group(s: &str) -> Result<(String, Vec<usize>), String> {
    let (name, cols) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=COLS, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("group name is empty in '{s}'"));
    }
    let columns = cols
        .split(',')
        .map(|c| c.trim().parse::<usize>().map_err(|e| format!("bad column '{c}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name.to_string(), columns))
}

/// Parse `COL=ETA`.
pub fn parse_calibrator(s: &str) -> Result<(usize, f64), String> {
    let (col, eta) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COL=ETA, got '{s}'"))?;
    let col = col.trim().parse::<usize>().map_err(|e| format!("bad column '{col}': {e}"))?;
    let eta = eta.trim().parse::<f64>().map_err(|e| format!("bad viscosity '{eta}': {e}"))?;
    Ok((col, eta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "plate1d", "-vv", "run", "plate.json", "--method", "consensus", "--columns", "1,3",
            "--group", "wt=1,3", "--calibrate", "1=0.89", "--end-hours", "1.5",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.method, ProfilingMethod::Consensus);
        assert_eq!(args.columns, vec![1, 3]);
        assert_eq!(args.groups, vec![("wt".to_string(), vec![1, 3])]);
        assert_eq!(args.calibrators, vec![(1, 0.89)]);
        assert_eq!(args.end_hours, Some(1.5));
        assert_eq!(args.table, ResultTable::Eta);
        assert!(args.stat.is_none());
    }

    #[test]
    fn columns_and_exclude_conflict() {
        let res = Cli::try_parse_from(["plate1d", "run", "p.json", "--columns", "1", "--exclude", "2"]);
        assert!(res.is_err());
    }

    #[test]
    fn preview_accepts_negative_samples() {
        let cli = Cli::parse_from(["plate1d", "preview", "--curve", "-0.1,1,0.5"]);
        let Command::Preview(args) = cli.command else {
            panic!("expected preview");
        };
        assert_eq!(args.curve, vec![-0.1, 1.0, 0.5]);
    }

    #[test]
    fn malformed_group_is_rejected() {
        assert!(parse_group("wt").is_err());
        assert!(parse_group("=1,2").is_err());
        assert!(parse_group("wt=1,x").is_err());
        assert!(parse_calibrator("1=abc").is_err());
    }
}
