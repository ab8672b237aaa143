//! Seeded synthetic plate generation.
//!
//! Every curve is the diffusion model for the column's viscosity at the
//! cell's elapsed time, shifted by a peak offset, lifted by a background and
//! perturbed with Gaussian noise. The same spec and seed always produce the
//! same document.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{CURVE_LEN, DEFAULT_SPACING_M, PlateConditions, RawPlateMatrix};
use crate::error::PlateError;
use crate::io::PlateDocument;
use crate::models::diffusion_gaussian;
use crate::physics::stokes_einstein::diffusion_coefficient;

/// Largest peak offset that keeps the peak inside the profiling window.
pub const MAX_PEAK_OFFSET: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPlateSpec {
    /// Viscosity per column (mPa·s); `None` is a capillary without probe.
    pub column_etas_mpas: Vec<Option<f64>>,
    pub reads: usize,
    pub radius_nm: f64,
    pub interval_minutes: f64,
    pub delay_minutes: f64,
    pub load_rate_minutes: f64,
    pub temperature_k: f64,
    pub spacing_m: f64,
    pub amplitude: f64,
    /// Samples between the diffusion peak and sample 1.
    pub peak_offset: usize,
    pub background: f64,
    /// Standard deviation of the additive noise.
    pub noise_sd: f64,
    pub seed: u64,
}

impl Default for SyntheticPlateSpec {
    fn default() -> Self {
        Self {
            column_etas_mpas: vec![Some(1.0), Some(1.5), Some(2.0)],
            reads: 6,
            radius_nm: 0.5,
            interval_minutes: 60.0,
            delay_minutes: 240.0,
            load_rate_minutes: 1.5,
            temperature_k: 297.0,
            spacing_m: DEFAULT_SPACING_M,
            amplitude: 1.0,
            peak_offset: 0,
            background: 0.0,
            noise_sd: 0.0,
            seed: 42,
        }
    }
}

impl SyntheticPlateSpec {
    fn validate(&self) -> Result<(), PlateError> {
        if self.column_etas_mpas.is_empty() {
            return Err(PlateError::config("Synthetic plate needs at least one column."));
        }
        if self.reads == 0 {
            return Err(PlateError::config("Synthetic plate needs at least one read."));
        }
        if let Some(bad) = self
            .column_etas_mpas
            .iter()
            .flatten()
            .find(|eta| !(eta.is_finite() && **eta > 0.0))
        {
            return Err(PlateError::config(format!("Synthetic viscosity must be > 0 (got {bad}).")));
        }
        if self.peak_offset > MAX_PEAK_OFFSET {
            return Err(PlateError::config(format!(
                "Peak offset {} is outside 0..={MAX_PEAK_OFFSET}.",
                self.peak_offset
            )));
        }
        if !(self.spacing_m.is_finite() && self.spacing_m > 0.0) {
            return Err(PlateError::config("Synthetic sample spacing must be > 0."));
        }
        if !(self.noise_sd.is_finite() && self.noise_sd >= 0.0) {
            return Err(PlateError::config("Synthetic noise must be >= 0."));
        }
        Ok(())
    }

    pub fn column_names(&self) -> Vec<String> {
        (1..=self.column_etas_mpas.len()).map(|i| format!("Column {i}")).collect()
    }

    pub fn conditions(&self) -> PlateConditions {
        PlateConditions::with_uniform_radius(
            &self.column_names(),
            self.radius_nm,
            self.interval_minutes,
            self.delay_minutes,
            self.load_rate_minutes,
            self.temperature_k,
        )
    }
}

/// Generate a plate document from `spec`.
pub fn generate_plate(spec: &SyntheticPlateSpec) -> Result<PlateDocument, PlateError> {
    spec.validate()?;
    let conditions = spec.conditions();

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = Normal::new(0.0, spec.noise_sd)
        .map_err(|e| PlateError::config(format!("Noise distribution error: {e}")))?;

    let mut columns = Vec::with_capacity(spec.column_etas_mpas.len());
    for (pos, &eta) in spec.column_etas_mpas.iter().enumerate() {
        let mut column = Vec::with_capacity(spec.reads * CURVE_LEN);
        for read in 0..spec.reads {
            let dt_m2 = eta.map(|eta| {
                let d = diffusion_coefficient(spec.temperature_k, eta, spec.radius_nm);
                d * conditions.elapsed_seconds(read, pos)
            });
            for sample in 0..CURVE_LEN {
                let signal = match dt_m2 {
                    Some(dt) => shifted_signal(sample, spec, dt),
                    None => 0.0,
                };
                let jitter = if spec.noise_sd > 0.0 { noise.sample(&mut rng) } else { 0.0 };
                column.push(spec.background + signal + jitter);
            }
        }
        columns.push(column);
    }

    let matrix = RawPlateMatrix::new(spec.column_names(), columns)?;
    let all: Vec<usize> = (0..matrix.num_columns()).collect();
    conditions.validate(&matrix, &all)?;
    Ok(PlateDocument { matrix, conditions })
}

/// Variance term the generator uses for a column of viscosity `eta_mpas`.
pub fn expected_dt(spec: &SyntheticPlateSpec, eta_mpas: f64, elapsed_seconds: f64) -> f64 {
    diffusion_coefficient(spec.temperature_k, eta_mpas, spec.radius_nm) * elapsed_seconds
}

fn shifted_signal(sample: usize, spec: &SyntheticPlateSpec, dt_m2: f64) -> f64 {
    // Sample `peak_offset + 1` carries the peak; both flanks follow the model.
    let index = sample.abs_diff(spec.peak_offset + 1) + 1;
    if dt_m2 <= 0.0 {
        return if index == 1 { spec.amplitude } else { 0.0 };
    }
    diffusion_gaussian(index, spec.amplitude, dt_m2, spec.spacing_m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::signal::argmax;

    #[test]
    fn same_seed_same_plate() {
        let spec = SyntheticPlateSpec {
            noise_sd: 0.01,
            ..SyntheticPlateSpec::default()
        };
        assert_eq!(generate_plate(&spec).unwrap(), generate_plate(&spec).unwrap());
        let other = SyntheticPlateSpec { seed: 7, ..spec.clone() };
        assert_ne!(generate_plate(&spec).unwrap(), generate_plate(&other).unwrap());
    }

    #[test]
    fn peak_moves_with_offset() {
        for offset in 0..=MAX_PEAK_OFFSET {
            let spec = SyntheticPlateSpec {
                peak_offset: offset,
                ..SyntheticPlateSpec::default()
            };
            let doc = generate_plate(&spec).unwrap();
            assert_eq!(argmax(doc.matrix.curve(2, 0)), Some(offset + 1), "offset {offset}");
        }
    }

    #[test]
    fn blank_column_is_flat_background() {
        let spec = SyntheticPlateSpec {
            column_etas_mpas: vec![Some(1.0), None],
            background: 0.1,
            ..SyntheticPlateSpec::default()
        };
        let doc = generate_plate(&spec).unwrap();
        assert!(doc.matrix.curve(0, 1).iter().all(|&v| v == 0.1));
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let bad_eta = SyntheticPlateSpec {
            column_etas_mpas: vec![Some(-1.0)],
            ..SyntheticPlateSpec::default()
        };
        assert!(generate_plate(&bad_eta).is_err());
        let bad_offset = SyntheticPlateSpec {
            peak_offset: 9,
            ..SyntheticPlateSpec::default()
        };
        assert!(generate_plate(&bad_offset).is_err());
    }

    #[test]
    fn curve_matches_model_at_expected_dt() {
        let spec = SyntheticPlateSpec::default();
        let doc = generate_plate(&spec).unwrap();
        let elapsed = doc.conditions.elapsed_seconds(1, 2);
        let dt = expected_dt(&spec, 2.0, elapsed);
        let curve = doc.matrix.curve(1, 2);
        assert_eq!(curve[1], 1.0);
        assert!((curve[3] - diffusion_gaussian(3, 1.0, dt, spec.spacing_m)).abs() < 1e-15);
        assert!((curve[0] - curve[2]).abs() < 1e-15);
    }
}
