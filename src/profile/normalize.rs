//! PlateNormalizer: max-normalization with overflow-spike suppression.
//!
//! Normalized curves feed the profiler only; fits always use the raw curve.

use crate::domain::{RawPlateMatrix, CURVE_LEN};

/// First index checked for overflow spikes.
pub const SPIKE_SEARCH_START: usize = 8;
/// Ratio to the previous sample above which a sample is a spike.
pub const SPIKE_RATIO: f64 = 100.0;
const SPIKE_EPSILON: f64 = 1e-9;

/// Normalize one curve by its maximum and suppress overflow spikes in its
/// back half.
///
/// - a curve whose maximum is not positive is left unscaled
/// - a single spike is replaced by the mean of its neighbours (by the previous
///   sample when it is the last one)
/// - several spikes are all set to the curve minimum
/// - the curve is normalized again afterwards
pub fn normalize_curve(curve: &[f64]) -> Vec<f64> {
    let mut norm = curve.to_vec();
    rescale(&mut norm);

    let spikes: Vec<usize> = (SPIKE_SEARCH_START..norm.len())
        .filter(|&i| norm[i] / (norm[i - 1] + SPIKE_EPSILON) > SPIKE_RATIO)
        .collect();

    match spikes.as_slice() {
        [] => {}
        [i] => {
            let i = *i;
            norm[i] = if i + 1 == norm.len() {
                norm[i - 1]
            } else {
                (norm[i - 1] + norm[i + 1]) / 2.0
            };
        }
        many => {
            let lowest = norm.iter().copied().fold(f64::INFINITY, f64::min);
            for &i in many {
                norm[i] = lowest;
            }
        }
    }

    rescale(&mut norm);
    norm
}

/// Normalized copies of every (read, column) curve, indexed `[read][column]`,
/// restricted to `columns` (plate indices, in processing order).
pub fn normalize_plate(matrix: &RawPlateMatrix, columns: &[usize]) -> Vec<Vec<Vec<f64>>> {
    (0..matrix.num_reads())
        .map(|read| {
            columns
                .iter()
                .map(|&col| normalize_curve(matrix.curve(read, col)))
                .collect()
        })
        .collect()
}

/// Mean normalized curve over all reads, one per processed column.
pub fn average_curves(normalized: &[Vec<Vec<f64>>], num_columns: usize) -> Vec<Vec<f64>> {
    let reads = normalized.len().max(1) as f64;
    (0..num_columns)
        .map(|col| {
            let mut acc = vec![0.0; CURVE_LEN];
            for read in normalized {
                for (a, v) in acc.iter_mut().zip(&read[col]) {
                    *a += v;
                }
            }
            acc.into_iter().map(|a| a / reads).collect()
        })
        .collect()
}

fn rescale(curve: &mut [f64]) {
    let max = curve.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 && max.is_finite() {
        for v in curve.iter_mut() {
            *v /= max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decay() -> Vec<f64> {
        let mut c = vec![0.0; CURVE_LEN];
        c[..8].copy_from_slice(&[20.0, 200.0, 140.0, 80.0, 40.0, 20.0, 10.0, 4.0]);
        c
    }

    #[test]
    fn scales_to_unit_maximum() {
        let n = normalize_curve(&decay());
        assert_eq!(n[1], 1.0);
        assert!((n[2] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn empty_curve_is_untouched() {
        assert_eq!(normalize_curve(&[0.0; CURVE_LEN]), vec![0.0; CURVE_LEN]);
    }

    #[test]
    fn single_overflow_spike_is_interpolated() {
        let mut c = decay();
        c[8] = 0.01;
        c[10] = 0.01;
        c[9] = 5000.0;
        let n = normalize_curve(&c);
        assert_eq!(n[1], 1.0);
        assert!((n[9] - 0.01 / 200.0).abs() < 1e-12);
    }

    #[test]
    fn trailing_spike_copies_previous_sample() {
        let mut c = decay();
        for v in &mut c[8..15] {
            *v = 0.02;
        }
        c[15] = 900.0;
        let n = normalize_curve(&c);
        assert_eq!(n[15], n[14]);
        assert_eq!(n[1], 1.0);
    }

    #[test]
    fn multiple_spikes_drop_to_minimum() {
        let mut c = decay();
        c[10] = 1000.0;
        c[13] = 1000.0;
        let n = normalize_curve(&c);
        assert_eq!(n[10], 0.0);
        assert_eq!(n[13], 0.0);
        assert_eq!(n[1], 1.0);
    }

    #[test]
    fn average_is_taken_over_reads() {
        let reads = vec![vec![vec![1.0; CURVE_LEN]], vec![vec![0.0; CURVE_LEN]]];
        let avg = average_curves(&reads, 1);
        assert_eq!(avg[0], vec![0.5; CURVE_LEN]);
    }
}
