//! Read/write plate JSON documents.
//!
//! A plate document bundles everything a run needs:
//! - the raw fluorescence matrix (named columns, 16 rows per read)
//! - the experimental conditions (timing, temperature, probe radii)
//!
//! The schema is defined by `PlateDocument` and the serde derives of the
//! domain types.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{PlateConditions, PlateResults, RawPlateMatrix};
use crate::error::PlateError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateDocument {
    pub matrix: RawPlateMatrix,
    pub conditions: PlateConditions,
}

/// Read a plate document and validate the matrix shape.
pub fn read_plate_document(path: &Path) -> Result<PlateDocument, PlateError> {
    let file = File::open(path).map_err(|e| PlateError::io(path, e))?;
    let doc: PlateDocument = serde_json::from_reader(BufReader::new(file))?;
    doc.matrix.validate()?;
    Ok(doc)
}

/// Write a plate document as pretty JSON.
pub fn write_plate_document(path: &Path, doc: &PlateDocument) -> Result<(), PlateError> {
    let file = File::create(path).map_err(|e| PlateError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), doc)?;
    Ok(())
}

/// Write the full results of a run (tables and issues) as pretty JSON.
pub fn write_results_json(path: &Path, results: &PlateResults) -> Result<(), PlateError> {
    let file = File::create(path).map_err(|e| PlateError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), results)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> PlateDocument {
        let names = vec!["Column 1".to_string(), "Column 2".to_string()];
        let col: Vec<f64> = (0..16).map(|i| 1.0 / (1.0 + i as f64)).collect();
        let matrix = RawPlateMatrix::new(names.clone(), vec![col.clone(), col]).unwrap();
        let conditions = PlateConditions::with_uniform_radius(&names, 50.0, 15.0, 0.0, 1.5, 297.0);
        PlateDocument { matrix, conditions }
    }

    #[test]
    fn document_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plate.json");
        let doc = document();
        write_plate_document(&path, &doc).unwrap();
        assert_eq!(read_plate_document(&path).unwrap(), doc);
    }

    #[test]
    fn malformed_matrix_is_a_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let json = r#"{
            "matrix": { "column_names": ["Column 1"], "columns": [[1.0, 2.0]] },
            "conditions": {
                "interval_minutes": 15.0, "delay_minutes": 0.0, "load_rate_minutes": 1.5,
                "temperature_k": 297.0, "radii_nm": { "Column 1": 50.0 }
            }
        }"#;
        std::fs::write(&path, json).unwrap();
        let err = read_plate_document(&path).unwrap_err();
        assert!(matches!(err, PlateError::DataShape(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_plate_document(Path::new("/nonexistent/plate.json")).unwrap_err();
        assert!(matches!(err, PlateError::Io { .. }));
    }
}
