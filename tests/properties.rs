//! Property-based tests for the per-curve operations and the unit conversions.

use proptest::prelude::*;

use diffusion_plate::data::{generate_plate, SyntheticPlateSpec};
use diffusion_plate::domain::{GaussianFit, PipelineConfig, ProfilingMethod, CURVE_LEN, MAX_END_INDEX, MIN_CURVE_SPAN};
use diffusion_plate::physics::stokes_einstein::{diffusion_coefficient, radius, temperature, viscosity};
use diffusion_plate::{clean_one_curve, normalize_curve, profile_one_curve, run_plate, to_fit_record};

fn curve_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.5f64..10.0, CURVE_LEN)
}

fn rel_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1e-300)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn profile_respects_index_bounds(curve in curve_strategy()) {
        let p = profile_one_curve(&normalize_curve(&curve));
        prop_assert!(p.peak_index <= 5);
        prop_assert!(p.end_index >= p.peak_index + MIN_CURVE_SPAN);
        prop_assert!(p.end_index <= MAX_END_INDEX);
    }

    #[test]
    fn profiling_is_deterministic(curve in curve_strategy()) {
        prop_assert_eq!(profile_one_curve(&curve), profile_one_curve(&curve));
    }

    #[test]
    fn normalized_curve_peaks_at_one(curve in curve_strategy()) {
        prop_assume!(curve.iter().any(|&v| v > 0.0));
        let norm = normalize_curve(&curve);
        let max = norm.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!((max - 1.0).abs() < 1e-12, "max {}", max);
    }
}

proptest! {
    #[test]
    fn cleaned_curve_is_non_negative(curve in curve_strategy(), peak in 0usize..=5) {
        let cleaned = clean_one_curve(&curve, peak);
        prop_assert_eq!(cleaned.len(), curve.len());
        prop_assert!(cleaned.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn stokes_einstein_round_trips(
        t in 250.0f64..350.0,
        eta in 0.1f64..100.0,
        r in 0.1f64..1000.0,
    ) {
        let d = diffusion_coefficient(t, eta, r);
        prop_assert!(rel_close(viscosity(t, d, r), eta));
        prop_assert!(rel_close(radius(t, d, eta), r));
        prop_assert!(rel_close(temperature(d, eta, r), t));
    }

    #[test]
    fn degenerate_inputs_never_divide_by_zero(
        amplitude in 0.0f64..2.0,
        dt in prop_oneof![Just(0.0), 1e-9f64..1e-3],
        elapsed in prop_oneof![Just(0.0), 1.0f64..1e5],
    ) {
        let fit = GaussianFit { amplitude, dt_m2: dt, nrmse: 0.0 };
        let rec = to_fit_record(&fit, elapsed, 297.0, 50.0);
        if dt == 0.0 || elapsed == 0.0 {
            prop_assert_eq!(rec.d_m2s, 0.0);
            prop_assert_eq!(rec.eta_mpas, 0.0);
        } else {
            prop_assert!(rec.d_m2s.is_finite() && rec.eta_mpas.is_finite());
        }
        prop_assert_eq!(diffusion_coefficient(297.0, 0.0, 50.0), f64::INFINITY);
        prop_assert_eq!(viscosity(297.0, 0.0, 50.0), f64::INFINITY);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn plate_runs_are_reproducible(seed in any::<u64>()) {
        let spec = SyntheticPlateSpec {
            reads: 3,
            noise_sd: 0.005,
            background: 0.01,
            seed,
            ..SyntheticPlateSpec::default()
        };
        let doc = generate_plate(&spec).unwrap();
        let config = PipelineConfig::with_method(ProfilingMethod::Consensus);
        let a = run_plate(&doc.matrix, &doc.conditions, &config).unwrap();
        let b = run_plate(&doc.matrix, &doc.conditions, &config).unwrap();
        prop_assert_eq!(a, b);
    }
}
