//! Stokes–Einstein relation between diffusion, viscosity, radius and temperature.
//!
//! ```text
//! D = k_B · T / (6π · η · r)
//! ```
//!
//! Units at the API boundary follow the lab conventions: `D` in m²/s, `η` in
//! mPa·s, `r` in nm, `T` in K. A zero denominator yields `+∞` instead of an
//! error so batch loops keep running.

use std::f64::consts::PI;

/// Boltzmann constant, J/K.
pub const BOLTZMANN: f64 = 1.380649e-23;

const NM_PER_M: f64 = 1e9;
const MPAS_PER_PAS: f64 = 1e3;

/// Diffusion coefficient (m²/s) of a probe of radius `radius_nm` in a fluid of
/// viscosity `eta_mpas`.
pub fn diffusion_coefficient(temperature_k: f64, eta_mpas: f64, radius_nm: f64) -> f64 {
    let eta_pas = eta_mpas / MPAS_PER_PAS;
    let radius_m = radius_nm / NM_PER_M;
    safe_ratio(BOLTZMANN * temperature_k, 6.0 * PI * eta_pas * radius_m)
}

/// Viscosity (mPa·s) implied by a diffusion coefficient for a probe of radius `radius_nm`.
pub fn viscosity(temperature_k: f64, d_m2s: f64, radius_nm: f64) -> f64 {
    let radius_m = radius_nm / NM_PER_M;
    safe_ratio(BOLTZMANN * temperature_k, 6.0 * PI * d_m2s * radius_m) * MPAS_PER_PAS
}

/// Probe radius (nm) that reproduces `d_m2s` in a fluid of viscosity `eta_mpas`.
pub fn radius(temperature_k: f64, d_m2s: f64, eta_mpas: f64) -> f64 {
    let eta_pas = eta_mpas / MPAS_PER_PAS;
    safe_ratio(BOLTZMANN * temperature_k, 6.0 * PI * d_m2s * eta_pas) * NM_PER_M
}

/// Temperature (K) at which a probe of radius `radius_nm` diffuses at `d_m2s`.
pub fn temperature(d_m2s: f64, eta_mpas: f64, radius_nm: f64) -> f64 {
    let eta_pas = eta_mpas / MPAS_PER_PAS;
    let radius_m = radius_nm / NM_PER_M;
    6.0 * PI * eta_pas * radius_m * d_m2s / BOLTZMANN
}

/// Diffusion coefficient from the fitted Gaussian variance term and elapsed time.
pub fn diffusion_from_dt(dt_m2: f64, elapsed_seconds: f64) -> f64 {
    safe_ratio(dt_m2, elapsed_seconds)
}

fn safe_ratio(numer: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        f64::INFINITY
    } else {
        numer / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_close(a: f64, b: f64) -> bool {
        ((a - b) / b).abs() < 1e-12
    }

    #[test]
    fn water_at_room_temperature() {
        // 50 nm beads in water (~0.911 mPa·s at 297 K) diffuse at ~4.8e-12 m²/s.
        let d = diffusion_coefficient(297.0, 0.911, 50.0);
        assert!((d - 4.777e-12).abs() < 1e-14, "got {d}");
        assert!(rel_close(viscosity(297.0, d, 50.0), 0.911));
    }

    #[test]
    fn inverse_relations_round_trip() {
        let (t, eta, r) = (310.0, 2.5, 100.0);
        let d = diffusion_coefficient(t, eta, r);
        assert!(rel_close(radius(t, d, eta), r));
        assert!(rel_close(temperature(d, eta, r), t));
    }

    #[test]
    fn zero_denominators_are_infinite() {
        assert_eq!(viscosity(297.0, 0.0, 50.0), f64::INFINITY);
        assert_eq!(diffusion_coefficient(297.0, 0.0, 50.0), f64::INFINITY);
        assert_eq!(radius(297.0, 0.0, 1.0), f64::INFINITY);
        assert_eq!(radius(297.0, 1e-12, 0.0), f64::INFINITY);
        assert_eq!(diffusion_from_dt(1e-6, 0.0), f64::INFINITY);
    }
}
