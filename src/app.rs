//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads plate documents and runs the pipeline
//! - prints summaries, calibrations and group reports
//! - writes optional exports

use clap::Parser;
use log::info;

use crate::cli::{Cli, Command, PreviewArgs, RunArgs, SimulateArgs};
use crate::data::{generate_plate, SyntheticPlateSpec};
use crate::error::{AppError, PlateError};

pub mod pipeline;

/// Entry point for the `plate1d` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(&args),
        Command::Simulate(args) => handle_simulate(&args),
        Command::Preview(args) => handle_preview(&args),
    }
}

/// `-v` count to the default log filter; `RUST_LOG` still takes precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let out = pipeline::run_document(args)?;

    println!(
        "{}",
        crate::report::format_run_summary(&out.results, &out.document.conditions)
    );
    if let Some(stat) = args.stat {
        println!(
            "{}",
            crate::report::format_statistics(args.table, stat, &out.statistics)
        );
    }
    if let Some(cal) = &out.calibration {
        println!("{}", crate::report::format_calibration(cal));
    }
    if !out.groups.is_empty() {
        println!("{}", crate::report::format_group_reports(&out.groups));
    }

    // Optional exports.
    if let Some(path) = &args.export_csv {
        crate::io::write_results_csv(path, &out.results)?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &args.export_json {
        crate::io::write_results_json(path, &out.results)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let spec = simulate_spec_from_args(args)?;
    let doc = generate_plate(&spec)?;
    crate::io::write_plate_document(&args.output, &doc)?;
    println!(
        "Wrote {} reads x {} columns to {}",
        doc.matrix.num_reads(),
        doc.matrix.num_columns(),
        args.output.display()
    );
    Ok(())
}

fn handle_preview(args: &PreviewArgs) -> Result<(), AppError> {
    if !(args.spacing_m.is_finite() && args.spacing_m > 0.0) {
        return Err(PlateError::config("Sample spacing must be > 0.").into());
    }
    if args.max_evals == 0 {
        return Err(PlateError::config("Optimizer evaluation budget must be > 0.").into());
    }

    let normalized = crate::profile::normalize_curve(&args.curve);
    let report = crate::profile::profile_with_report(&normalized);
    let cleaned = crate::profile::clean_one_curve(&args.curve, report.profile.peak_index);
    let fit = crate::fit::fit_one_curve(&cleaned, report.profile.end_index, args.spacing_m, args.max_evals);

    println!("{}", crate::report::format_curve_preview(&report, &cleaned, &fit));

    if let (Some(minutes), Ok(fit)) = (args.elapsed, &fit) {
        let record = crate::fit::to_fit_record(fit, minutes * 60.0, args.temperature, args.radius);
        println!(
            "D={:.4e} m²/s | eta={:.4} mPa·s (t={minutes} min, T={} K, r={} nm)",
            record.d_m2s, record.eta_mpas, args.temperature, args.radius
        );
    }
    Ok(())
}

pub fn simulate_spec_from_args(args: &SimulateArgs) -> Result<SyntheticPlateSpec, AppError> {
    if let Some(bad) = args.blank.iter().find(|&&c| c == 0 || c > args.etas.len()) {
        return Err(PlateError::config(format!(
            "Blank column {bad} does not exist (plate has columns 1..={}).",
            args.etas.len()
        ))
        .into());
    }

    let column_etas_mpas = args
        .etas
        .iter()
        .enumerate()
        .map(|(i, &eta)| (!args.blank.contains(&(i + 1))).then_some(eta))
        .collect();

    Ok(SyntheticPlateSpec {
        column_etas_mpas,
        reads: args.reads,
        radius_nm: args.radius,
        interval_minutes: args.interval,
        delay_minutes: args.delay,
        load_rate_minutes: args.load_rate,
        temperature_k: args.temperature,
        amplitude: 1.0,
        peak_offset: args.peak_offset,
        background: args.background,
        noise_sd: args.noise,
        seed: args.seed,
        ..SyntheticPlateSpec::default()
    })
}
