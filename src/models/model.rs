//! Gaussian model evaluation.
//!
//! Two shapes are used:
//! - the profiling candidate `a·exp(−(x − μ)² / (2σ²))` on sample indices
//! - the diffusion model `A·exp(−(x·Δx − Δx)² / (2·Dt))` in meters, with the
//!   peak pinned at sample 1

/// Smallest σ used when evaluating the candidate; σ = 0 is a legal bound.
const MIN_SIGMA: f64 = 1e-12;

/// Candidate Gaussian at sample position `x`.
pub fn candidate_gaussian(x: f64, amplitude: f64, mean: f64, sigma: f64) -> f64 {
    let s = sigma.max(MIN_SIGMA);
    amplitude * (-(x - mean).powi(2) / (2.0 * s * s)).exp()
}

/// Diffusion Gaussian at sample index `index`.
pub fn diffusion_gaussian(index: usize, amplitude: f64, dt_m2: f64, spacing_m: f64) -> f64 {
    let offset = index as f64 * spacing_m - spacing_m;
    amplitude * (-(offset * offset) / (2.0 * dt_m2)).exp()
}

/// The diffusion model sampled at indices `0..len`.
pub fn predict_diffusion(len: usize, amplitude: f64, dt_m2: f64, spacing_m: f64) -> Vec<f64> {
    (0..len)
        .map(|i| diffusion_gaussian(i, amplitude, dt_m2, spacing_m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffusion_peak_sits_on_second_sample() {
        let y = predict_diffusion(6, 2.0, 5e-5, 4.5e-3);
        assert_eq!(y[1], 2.0);
        assert!((y[0] - y[2]).abs() < 1e-15);
        assert!(y[3] < y[2]);
    }

    #[test]
    fn candidate_with_zero_sigma_is_finite() {
        assert_eq!(candidate_gaussian(1.0, 0.8, 1.0, 0.0), 0.8);
        assert_eq!(candidate_gaussian(2.0, 0.8, 1.0, 0.0), 0.0);
    }
}
