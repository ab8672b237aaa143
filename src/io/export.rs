//! Export per-cell results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! one row per (read, column) cell, missing fits as empty fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::PlateResults;
use crate::error::PlateError;

/// Write the long-format result table to a CSV file.
pub fn write_results_csv(path: &Path, results: &PlateResults) -> Result<(), PlateError> {
    let file = File::create(path).map_err(|e| PlateError::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_results(&mut out, results).map_err(|e| PlateError::io(path, e))?;
    out.flush().map_err(|e| PlateError::io(path, e))
}

fn write_results(out: &mut impl Write, results: &PlateResults) -> std::io::Result<()> {
    // Header
    writeln!(out, "read,column,peak,end,amplitude,dt_m2,d_m2s,eta_mpas,nrmse")?;

    for read in 0..results.num_reads() {
        for (pos, name) in results.column_names().iter().enumerate() {
            let peak = results.peaks.get(read, pos).map(|p| p.to_string()).unwrap_or_default();
            let end = results.ends.get(read, pos).map(|e| e.to_string()).unwrap_or_default();
            let fit = match results.fits.get(read, pos).copied().flatten() {
                Some(r) => format!(
                    "{:.10},{:.10e},{:.10e},{:.10},{:.10}",
                    r.amplitude, r.dt_m2, r.d_m2s, r.eta_mpas, r.nrmse
                ),
                None => ",,,,".to_string(),
            };
            writeln!(out, "{read},{},{peak},{end},{fit}", csv_field(name))?;
        }
    }

    Ok(())
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitRecord, ProfilingMethod, ReadTable};

    #[test]
    fn missing_cells_become_empty_fields() {
        let names = vec!["Column 1".to_string(), "a,b".to_string()];
        let rec = FitRecord {
            amplitude: 1.0,
            dt_m2: 1e-6,
            d_m2s: 1e-9,
            eta_mpas: 0.5,
            nrmse: 0.02,
        };
        let results = PlateResults {
            method: ProfilingMethod::Individual,
            peaks: ReadTable::from_fn(1, names.clone(), |_, _| 1),
            ends: ReadTable::from_fn(1, names.clone(), |_, _| 6),
            fits: ReadTable::from_rows(names, vec![vec![Some(rec), None]]).unwrap(),
            issues: Vec::new(),
        };

        let mut buf = Vec::new();
        write_results(&mut buf, &results).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,Column 1,1,6,1.0000000000,"));
        assert_eq!(lines[2], "0,\"a,b\",1,6,,,,,");
    }
}
