//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the numerical code stays clean and testable
//! - output changes are localized

use crate::analysis::{CalibratedResults, GroupReport, GroupSummary, ResultTable, Statistic};
use crate::domain::{GaussianFit, PlateConditions, PlateResults};
use crate::fit::FitFailure;
use crate::math::stats::median;
use crate::profile::ProfileReport;

/// Plate shape, method, fit counts, per-column medians and absorbed issues.
pub fn format_run_summary(results: &PlateResults, conditions: &PlateConditions) -> String {
    let mut out = String::new();

    out.push_str("=== plate1d - 1D capillary diffusion ===\n");
    out.push_str(&format!(
        "Plate: {} reads x {} columns | method={}\n",
        results.num_reads(),
        results.column_names().len(),
        results.method.display_name()
    ));
    out.push_str(&format!(
        "Conditions: interval={} min | delay={} min | load rate={} min | T={} K\n",
        conditions.interval_minutes, conditions.delay_minutes, conditions.load_rate_minutes, conditions.temperature_k
    ));
    out.push_str(&format!(
        "Fits: {}/{} cells\n\n",
        results.successful_fits(),
        results.total_cells()
    ));

    out.push_str(
        format!(
            "{:<16} {:>6} {:>12} {:>12} {:>10} {:>6}\n",
            "column", "r(nm)", "eta(mPa·s)", "D(m²/s)", "nrmse", "fits"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<6} {:-<12} {:-<12} {:-<10} {:-<6}\n", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for (pos, name) in results.column_names().iter().enumerate() {
        let records: Vec<_> = results.fits.column(pos).flatten().collect();
        let eta: Vec<f64> = records.iter().map(|r| r.eta_mpas).collect();
        let d: Vec<f64> = records.iter().map(|r| r.d_m2s).collect();
        let nrmse: Vec<f64> = records.iter().map(|r| r.nrmse).collect();
        out.push_str(&format!(
            "{:<16} {:>6} {:>12} {:>12} {:>10} {:>6}\n",
            truncate(name, 16),
            fmt_opt(conditions.radius_nm(name), 1),
            fmt_fixed(median(&eta), 4),
            fmt_sci(median(&d)),
            fmt_fixed(median(&nrmse), 4),
            format!("{}/{}", records.len(), results.num_reads()),
        ));
    }

    if !results.issues.is_empty() {
        out.push_str(&format!("\nAbsorbed issues ({}):\n", results.issues.len()));
        for issue in &results.issues {
            out.push_str(&format!(
                "- read {:>3} | {:<16} | {}\n",
                issue.read,
                truncate(&issue.column, 16),
                issue.kind.display_name()
            ));
        }
    }

    out
}

/// One statistic of one result table, per column.
pub fn format_statistics(table: ResultTable, stat: Statistic, rows: &[(String, f64)]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} of {}:\n", stat.display_name(), table.display_name()));
    for (column, value) in rows {
        let value = match table {
            ResultTable::Eta | ResultTable::Nrmse | ResultTable::Amplitude => fmt_fixed(*value, 4),
            ResultTable::D | ResultTable::Dt => fmt_sci(*value),
        };
        out.push_str(&format!("- {:<16} {:>12}\n", truncate(column, 16), value));
    }
    out
}

/// η and D group tables with outlier flags and summary rows.
pub fn format_group_reports(reports: &[GroupReport]) -> String {
    let mut out = String::new();

    for report in reports {
        out.push_str(&format!("Group {} (n={})\n", report.name, report.entries.len()));
        out.push_str(format!("  {:<16} {:>12} {:>12} {:<7}\n", "column", "eta(mPa·s)", "D(m²/s)", "").trim_end());
        out.push('\n');
        for e in &report.entries {
            out.push_str(
                format!(
                    "  {:<16} {:>12} {:>12} {:<7}\n",
                    truncate(&e.column, 16),
                    fmt_fixed(e.eta_mpas, 4),
                    fmt_sci(e.d_m2s),
                    if e.outlier { "OUTLIER" } else { "" }
                )
                .trim_end(),
            );
            out.push('\n');
        }
        out.push_str(&summary_rows("clean", &report.eta, &report.d));
        out.push_str(&summary_rows("raw", &report.eta_raw, &report.d_raw));
        out.push('\n');
    }

    out
}

/// Calibrated radii and the columns left uncalibrated.
pub fn format_calibration(cal: &CalibratedResults) -> String {
    let mut out = String::new();

    out.push_str("Radius calibration:\n");
    for r in &cal.radii {
        out.push_str(&format!(
            "- nominal {:.1} nm -> calibrated {} nm ({} estimates, {} rejected)\n",
            r.nominal_nm,
            fmt_fixed(r.calibrated_nm, 2),
            r.estimates_nm.len(),
            r.rejected_nm.len()
        ));
    }
    if !cal.uncalibrated_columns.is_empty() {
        out.push_str(&format!("Uncalibrated: {}\n", cal.uncalibrated_columns.join(", ")));
    }

    out.push_str("\nCalibrated medians:\n");
    for (pos, name) in cal.eta_mpas.column_names().iter().enumerate() {
        let eta: Vec<f64> = cal.eta_mpas.column(pos).flatten().copied().collect();
        let d: Vec<f64> = cal.d_m2s.column(pos).flatten().copied().collect();
        if eta.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "- {:<16} eta={} mPa·s | D={} m²/s\n",
            truncate(name, 16),
            fmt_fixed(median(&eta), 4),
            fmt_sci(median(&d))
        ));
    }

    out
}

/// Candidate scores, end votes, cleaned curve and fit of a single curve.
pub fn format_curve_preview(
    report: &ProfileReport,
    cleaned: &[f64],
    fit: &Result<GaussianFit, FitFailure>,
) -> String {
    let mut out = String::new();

    let p = report.profile;
    if p.is_empty() {
        out.push_str("Profile: empty curve (no signal)\n");
    } else {
        out.push_str(&format!("Profile: peak={} end={}\n", p.peak_index, p.end_index));
    }

    if !report.candidates.is_empty() {
        out.push_str(format!("{:>5} {:>12} {:>10} {:>12} {:>8}\n", "cand", "error", "penalty", "penalized", "sigma").trim_end());
        out.push('\n');
        for c in &report.candidates {
            let chosen = if c.index == p.peak_index { "*" } else { " " };
            out.push_str(&format!(
                "{chosen}{:>4} {:>12} {:>10} {:>12} {:>8}\n",
                c.index,
                fmt_fixed(c.base_error, 4),
                fmt_fixed(c.penalty, 4),
                fmt_fixed(c.penalized_error, 4),
                fmt_opt(c.sigma, 3)
            ));
        }
        let v = report.end_votes;
        out.push_str(&format!(
            "End votes: derivative={} fraction={} sigma={}\n",
            fmt_vote(v.derivative),
            fmt_vote(v.fraction),
            fmt_vote(v.sigma)
        ));
    }

    out.push_str(&format!("Cleaned: {}\n", fmt_vec(cleaned)));
    match fit {
        Ok(f) => out.push_str(&format!(
            "Fit: A={:.4} Dt={:.4e} m² nrmse={:.4}\n",
            f.amplitude, f.dt_m2, f.nrmse
        )),
        Err(e) => out.push_str(&format!("Fit: failed ({e:?})\n")),
    }

    out
}

fn summary_rows(label: &str, eta: &GroupSummary, d: &GroupSummary) -> String {
    let mut out = String::new();
    for (stat, e, dv) in [
        ("mean", eta.mean, d.mean),
        ("median", eta.median, d.median),
        ("stdev", eta.std_dev, d.std_dev),
    ] {
        out.push_str(&format!(
            "  {:<16} {:>12} {:>12}\n",
            format!("{stat} ({label})"),
            fmt_fixed(e, 4),
            fmt_sci(dv)
        ));
    }
    out
}

fn fmt_fixed(v: f64, decimals: usize) -> String {
    if v.is_finite() { format!("{v:.decimals$}") } else { "-".to_string() }
}

fn fmt_sci(v: f64) -> String {
    if v.is_finite() { format!("{v:.3e}") } else { "-".to_string() }
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map_or_else(|| "-".to_string(), |v| fmt_fixed(v, decimals))
}

fn fmt_vote(v: Option<usize>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
