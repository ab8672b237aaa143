//! Box-constrained Levenberg–Marquardt.
//!
//! Minimizes `Σ r_i(p)²` for a residual function `r` over a box `lower ≤ p ≤ upper`.
//!
//! Implementation choices:
//! - Jacobians are forward differences (backward when the forward point would
//!   leave the box). A parameter whose bounds coincide is held fixed.
//! - The damped normal equations are solved in Marquardt-scaled coordinates
//!   (unit diagonal), so parameters of very different magnitude (an amplitude
//!   near 1 next to a variance near 1e-6 m²) stay well conditioned.
//! - A parameter resting on a bound whose gradient points out of the box is
//!   dropped from the damped system for that iteration (active set), and
//!   the remaining trial point is projected back onto the box.
//! - Besides the SSE and step tolerances, the search stops once the
//!   gradient of the free parameters vanishes.
//! - The budget counts residual evaluations, Jacobian columns included.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

const SQRT_EPS: f64 = 1.490_116_119_384_765_6e-8;
const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
const SSE_FLOOR: f64 = 1e-30;

/// Per-parameter box constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Build bounds; each pair is reordered so that `lower ≤ upper`.
    pub fn new(lower: &[f64], upper: &[f64]) -> Self {
        let (lower, upper) = lower
            .iter()
            .zip(upper)
            .map(|(&a, &b)| (a.min(b), a.max(b)))
            .unzip();
        Self { lower, upper }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    fn clamp(&self, x: &mut [f64]) {
        for ((v, &lo), &hi) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *v = v.clamp(lo, hi);
        }
    }

    fn width(&self, j: usize) -> f64 {
        self.upper[j] - self.lower[j]
    }

    /// `false` when `x` sits on a bound and the gradient `g` of the SSE
    /// pushes it further out, or when the parameter is fixed.
    fn is_free(&self, j: usize, x: f64, g: f64) -> bool {
        if self.width(j) <= 0.0 {
            return false;
        }
        !((x <= self.lower[j] && g > 0.0) || (x >= self.upper[j] && g < 0.0))
    }
}

/// Stopping rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub max_evaluations: usize,
    /// Relative SSE reduction below which an accepted step ends the search.
    pub ftol: f64,
    /// Relative per-parameter step below which the search ends.
    pub xtol: f64,
    /// Cosine between the residuals and every free Jacobian column below
    /// which the search ends.
    pub gtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 2000,
            ftol: 1e-12,
            xtol: 1e-10,
            gtol: 1e-10,
        }
    }
}

impl LmOptions {
    pub fn with_budget(max_evaluations: usize) -> Self {
        Self {
            max_evaluations,
            ..Self::default()
        }
    }
}

/// Outcome of a minimization that produced finite numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct LmReport {
    pub params: Vec<f64>,
    pub sse: f64,
    pub evaluations: usize,
    /// `false` when the evaluation budget ran out before a stopping rule fired.
    pub converged: bool,
}

/// The problem could not be evaluated at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LmFailure {
    /// Residuals or Jacobian were not finite at an accepted point.
    NonFinite,
    /// Parameter vector and bounds disagree in length.
    DimensionMismatch,
}

/// Minimize `‖residuals(p)‖²` within `bounds`, starting from `x0`.
pub fn minimize_bounded<F>(
    mut residuals: F,
    x0: &[f64],
    bounds: &Bounds,
    opts: &LmOptions,
) -> Result<LmReport, LmFailure>
where
    F: FnMut(&[f64]) -> DVector<f64>,
{
    let p = x0.len();
    if p == 0 || bounds.len() != p {
        return Err(LmFailure::DimensionMismatch);
    }

    let mut x = x0.to_vec();
    bounds.clamp(&mut x);

    let mut r = residuals(&x);
    let mut evaluations = 1;
    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return Err(LmFailure::NonFinite);
    }

    let mut lambda = LAMBDA_START;
    let mut converged = false;

    'outer: while evaluations < opts.max_evaluations {
        if sse <= SSE_FLOOR {
            converged = true;
            break;
        }

        let jac = forward_jacobian(&mut residuals, &x, &r, bounds, &mut evaluations)
            .ok_or(LmFailure::NonFinite)?;
        let jtj = jac.transpose() * &jac;
        let jtr = jac.transpose() * &r;

        let scale: Vec<f64> = (0..p)
            .map(|j| {
                let d = jtj[(j, j)].sqrt();
                if d.is_finite() && d > 0.0 { d } else { 1.0 }
            })
            .collect();

        // Parameters pinned by a bound the descent direction points out of
        // are frozen for this iteration.
        let free: Vec<usize> = (0..p).filter(|&j| bounds.is_free(j, x[j], jtr[j])).collect();
        let r_norm = sse.sqrt();
        let gradient_is_tiny = free
            .iter()
            .all(|&j| jtr[j].abs() <= opts.gtol * scale[j] * r_norm);
        if gradient_is_tiny {
            converged = true;
            break;
        }
        let k = free.len();

        loop {
            if evaluations >= opts.max_evaluations {
                break 'outer;
            }

            let mut lhs = DMatrix::<f64>::zeros(k, k);
            let mut rhs = DVector::<f64>::zeros(k);
            for (a, &i) in free.iter().enumerate() {
                for (b, &j) in free.iter().enumerate() {
                    lhs[(a, b)] = jtj[(i, j)] / (scale[i] * scale[j]);
                }
                lhs[(a, a)] += lambda;
                rhs[a] = -jtr[i] / scale[i];
            }

            let Some(z) = solve_least_squares(&lhs, &rhs) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    converged = true;
                    break 'outer;
                }
                continue;
            };

            let mut trial = x.clone();
            for (a, &j) in free.iter().enumerate() {
                trial[j] += z[a] / scale[j];
            }
            bounds.clamp(&mut trial);

            let step_is_tiny = trial
                .iter()
                .zip(&x)
                .all(|(t, xi)| (t - xi).abs() <= opts.xtol * (xi.abs() + opts.xtol));
            if step_is_tiny {
                converged = true;
                break 'outer;
            }

            let r_trial = residuals(&trial);
            evaluations += 1;
            let sse_trial = r_trial.norm_squared();

            if sse_trial.is_finite() && sse_trial < sse {
                let reduction = sse - sse_trial;
                x = trial;
                r = r_trial;
                sse = sse_trial;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                if reduction <= opts.ftol * sse {
                    converged = true;
                    break 'outer;
                }
                continue 'outer;
            }

            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                // No direction improves the objective: a (bounded) stationary point.
                converged = true;
                break 'outer;
            }
        }
    }

    Ok(LmReport {
        params: x,
        sse,
        evaluations,
        converged,
    })
}

fn forward_jacobian<F>(
    residuals: &mut F,
    x: &[f64],
    r0: &DVector<f64>,
    bounds: &Bounds,
    evaluations: &mut usize,
) -> Option<DMatrix<f64>>
where
    F: FnMut(&[f64]) -> DVector<f64>,
{
    let n = r0.len();
    let p = x.len();
    let mut jac = DMatrix::<f64>::zeros(n, p);
    let mut probe = x.to_vec();

    for j in 0..p {
        let width = bounds.width(j);
        if width <= 0.0 {
            continue; // fixed parameter
        }

        let mut h = SQRT_EPS * x[j].abs().max(width * 1e-3);
        if x[j] + h > bounds.upper[j] {
            h = -h;
        }

        probe[j] = x[j] + h;
        let r_h = residuals(&probe);
        *evaluations += 1;
        probe[j] = x[j];

        if r_h.len() != n {
            return None;
        }
        for i in 0..n {
            let d = (r_h[i] - r0[i]) / h;
            if !d.is_finite() {
                return None;
            }
            jac[(i, j)] = d;
        }
    }

    Some(jac)
}
