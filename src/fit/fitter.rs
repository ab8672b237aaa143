//! GaussianFitter: constrained fit of the diffusion model to one cleaned curve.
//!
//! Given a cleaned curve `y`, an end index and the sample spacing `Δx`, we fit
//!
//! ```text
//! ŷ(i) = A · exp(−(i·Δx − Δx)² / (2·Dt))
//! ```
//!
//! over samples `1..end_index` (sample 0 is the mirrored side of the pinned
//! peak and never scored).
//!
//! Implementation choices:
//! - The objective is the NRMSE. We hand the bounded Levenberg–Marquardt the
//!   residuals `(ŷ − y) / (mean|y| · √n)`, whose squared norm is exactly
//!   `nrmse²`, so minimizing SSE minimizes NRMSE.
//! - `A` may drift 5% around the sample at the peak; `Dt ∈ [1e-9, 1e-1]` m².

use nalgebra::DVector;

use crate::domain::{CellIssueKind, FitRecord, GaussianFit};
use crate::math::{minimize_bounded, Bounds, LmFailure, LmOptions};
use crate::models::diffusion_gaussian;
use crate::physics::stokes_einstein::{diffusion_from_dt, viscosity};

const FIRST_SCORED_INDEX: usize = 1;
const AMPLITUDE_DRIFT: f64 = 0.05;
const DT_GUESS: f64 = 1e-6;
const DT_MIN: f64 = 1e-9;
const DT_MAX: f64 = 1e-1;

/// Why a single curve could not be fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitFailure {
    /// `[1, end_index)` holds no sample.
    NoSamples,
    /// The evaluation budget ran out.
    NonConvergence,
    /// The objective or the fitted parameters were not finite.
    NonFinite,
}

impl FitFailure {
    pub fn issue_kind(self) -> CellIssueKind {
        match self {
            FitFailure::NonConvergence => CellIssueKind::NonConvergence,
            FitFailure::NoSamples | FitFailure::NonFinite => CellIssueKind::NonFinite,
        }
    }
}

/// Fit `(A, Dt)` to a cleaned curve truncated at `end_index`.
pub fn fit_one_curve(
    curve: &[f64],
    end_index: usize,
    spacing_m: f64,
    max_evaluations: usize,
) -> Result<GaussianFit, FitFailure> {
    let end = end_index.min(curve.len());
    if end <= FIRST_SCORED_INDEX {
        return Err(FitFailure::NoSamples);
    }
    let scored = &curve[FIRST_SCORED_INDEX..end];
    let norm = residual_norm(scored);

    let a0 = curve[FIRST_SCORED_INDEX];
    let bounds = Bounds::new(
        &[a0 * (1.0 - AMPLITUDE_DRIFT), DT_MIN],
        &[a0 * (1.0 + AMPLITUDE_DRIFT), DT_MAX],
    );
    let opts = LmOptions::with_budget(max_evaluations);

    let residuals = |p: &[f64]| {
        DVector::from_iterator(
            scored.len(),
            scored.iter().enumerate().map(|(k, &y)| {
                let i = k + FIRST_SCORED_INDEX;
                (diffusion_gaussian(i, p[0], p[1], spacing_m) - y) / norm
            }),
        )
    };

    let report = minimize_bounded(residuals, &[a0, DT_GUESS], &bounds, &opts).map_err(|e| match e {
        LmFailure::NonFinite | LmFailure::DimensionMismatch => FitFailure::NonFinite,
    })?;
    if !report.converged {
        return Err(FitFailure::NonConvergence);
    }

    let (amplitude, dt_m2) = (report.params[0], report.params[1]);
    let nrmse = nrmse(curve, end_index, amplitude, dt_m2, spacing_m);
    if !(amplitude.is_finite() && dt_m2.is_finite() && nrmse.is_finite()) {
        return Err(FitFailure::NonFinite);
    }

    Ok(GaussianFit {
        amplitude,
        dt_m2,
        nrmse,
    })
}

/// NRMSE of the diffusion model against `curve` over `[1, end_index)`.
///
/// Falls back to the plain RMSE when the scored samples average to zero.
pub fn nrmse(curve: &[f64], end_index: usize, amplitude: f64, dt_m2: f64, spacing_m: f64) -> f64 {
    let end = end_index.min(curve.len());
    if end <= FIRST_SCORED_INDEX {
        return f64::NAN;
    }
    let scored = &curve[FIRST_SCORED_INDEX..end];
    let sse: f64 = scored
        .iter()
        .enumerate()
        .map(|(k, &y)| (diffusion_gaussian(k + FIRST_SCORED_INDEX, amplitude, dt_m2, spacing_m) - y).powi(2))
        .sum();
    let rmse = (sse / scored.len() as f64).sqrt();
    let mean_abs = scored.iter().map(|v| v.abs()).sum::<f64>() / scored.len() as f64;
    if mean_abs != 0.0 { rmse / mean_abs } else { rmse }
}

/// Convert a fit into physical units for the given elapsed time.
///
/// A zero `Dt` or a zero elapsed time reports `D = 0` and `η = 0`.
pub fn to_fit_record(fit: &GaussianFit, elapsed_seconds: f64, temperature_k: f64, radius_nm: f64) -> FitRecord {
    let (d_m2s, eta_mpas) = if fit.dt_m2 == 0.0 || elapsed_seconds == 0.0 {
        (0.0, 0.0)
    } else {
        let d = diffusion_from_dt(fit.dt_m2, elapsed_seconds);
        (d, viscosity(temperature_k, d, radius_nm))
    };

    FitRecord {
        amplitude: fit.amplitude,
        dt_m2: fit.dt_m2,
        d_m2s,
        eta_mpas,
        nrmse: fit.nrmse,
    }
}

fn residual_norm(scored: &[f64]) -> f64 {
    let n = scored.len() as f64;
    let mean_abs = scored.iter().map(|v| v.abs()).sum::<f64>() / n;
    if mean_abs != 0.0 { mean_abs * n.sqrt() } else { n.sqrt() }
}
