//! Linear least squares solver.
//!
//! The Levenberg–Marquardt iterations repeatedly solve tiny damped normal
//! equations:
//!
//! ```text
//! (S⁻¹JᵀJS⁻¹ + λ·I) z = −S⁻¹Jᵀr,   δ = S⁻¹z
//! ```
//!
//! Implementation choices:
//! - We use SVD so the solve stays robust when `JᵀJ` is singular (e.g. a
//!   parameter whose bounds collapse to a single value gives a zero column).
//! - Parameter dimension is 2–3, so SVD cost does not matter.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-10, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn singular_system_returns_minimum_norm_solution() {
        // Second unknown has no influence; SVD leaves it at zero.
        let x = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.0]);
        let y = DVector::from_row_slice(&[8.0, 0.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-12);
        assert!(beta[1].abs() < 1e-12);
    }
}
