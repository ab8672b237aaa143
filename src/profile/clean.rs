//! CurveCleaner: peak alignment, noise-floor subtraction, non-negativity.
//!
//! The diffusion model pins its peak at sample 1, so alignment moves the
//! profiled peak onto that sample:
//! - peak 0: prepend a mirror of sample 1 and drop the last sample
//! - peak 1: unchanged
//! - peaks 2..=4: drop `peak − 1` leading samples and repeat the last sample
//!   to keep the length
//! - anything else (including the empty sentinel 5): unchanged

use std::ops::RangeInclusive;

/// Raw sample indices whose minimum estimates the background.
pub const NOISE_WINDOW: RangeInclusive<usize> = 7..=10;

/// Largest peak index that is realigned.
const MAX_ALIGNED_PEAK: usize = 4;

/// Clean one raw curve for fitting. The output has the input's length and no
/// negative samples.
pub fn clean_one_curve(raw: &[f64], peak_index: usize) -> Vec<f64> {
    let floor = noise_floor(raw).abs();
    let mut curve: Vec<f64> = align_peak(raw, peak_index).into_iter().map(|v| v - floor).collect();

    let lowest = curve.iter().copied().fold(f64::INFINITY, f64::min);
    if lowest < 0.0 {
        let lift = lowest.abs();
        for v in &mut curve {
            *v += lift;
        }
    }
    curve
}

/// Move the sample at `peak_index` onto index 1.
pub fn align_peak(raw: &[f64], peak_index: usize) -> Vec<f64> {
    let n = raw.len();
    match peak_index {
        0 if n >= 2 => {
            let mut out = Vec::with_capacity(n);
            out.push(raw[1]);
            out.extend_from_slice(&raw[..n - 1]);
            out
        }
        2..=MAX_ALIGNED_PEAK if n > peak_index - 1 => {
            let k = peak_index - 1;
            let last = raw[n - 1];
            let mut out = raw[k..].to_vec();
            out.resize(n, last);
            out
        }
        _ => raw.to_vec(),
    }
}

/// Background estimate: minimum of the raw samples in `NOISE_WINDOW`
/// (clipped to the curve), `0` when the curve is too short.
pub fn noise_floor(raw: &[f64]) -> f64 {
    let start = *NOISE_WINDOW.start();
    let end = (*NOISE_WINDOW.end() + 1).min(raw.len());
    raw.get(start..end)
        .and_then(|w| w.iter().copied().reduce(f64::min))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Vec<f64> {
        (0..16).map(|v| v as f64).collect()
    }

    #[test]
    fn peak_zero_is_mirrored() {
        let out = align_peak(&ramp(), 0);
        assert_eq!(&out[..4], &[1.0, 0.0, 1.0, 2.0]);
        assert_eq!(out.len(), 16);
        assert_eq!(out[15], 14.0);
    }

    #[test]
    fn later_peaks_shift_left_and_pad_with_last_value() {
        let out = align_peak(&ramp(), 3);
        assert_eq!(out[1], 3.0);
        assert_eq!(&out[13..], &[15.0, 15.0, 15.0]);
        assert_eq!(align_peak(&ramp(), 1), ramp());
        assert_eq!(align_peak(&ramp(), 5), ramp());
    }

    #[test]
    fn noise_floor_uses_raw_window() {
        let mut c = vec![5.0; 16];
        c[9] = 0.5;
        c[12] = -3.0; // outside the window
        assert_eq!(noise_floor(&c), 0.5);
        assert_eq!(noise_floor(&[1.0, 2.0]), 0.0);
        assert_eq!(noise_floor(&c[..9]), 5.0);
    }

    #[test]
    fn cleaned_curve_is_floor_subtracted() {
        let mut c = vec![0.2; 16];
        c[1] = 1.2;
        let out = clean_one_curve(&c, 1);
        assert!((out[1] - 1.0).abs() < 1e-12);
        assert!(out[5].abs() < 1e-12);
    }

    #[test]
    fn negative_background_is_lifted_uniformly() {
        let mut c = vec![0.0; 16];
        c[1] = 1.0;
        c[7] = -0.5;
        c[14] = -2.0;
        let out = clean_one_curve(&c, 1);
        // floor |−0.5| subtracted, then everything lifted by 2.5
        assert!(out.iter().all(|&v| v >= 0.0));
        assert!((out[14]).abs() < 1e-12);
        assert!((out[1] - out[0] - 1.0).abs() < 1e-12);
    }
}
