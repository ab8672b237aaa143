//! Descriptive and robust statistics over `f64` slices.
//!
//! Empty inputs return `NaN` so callers can store "no value" in result tables
//! without a separate branch.

/// Scale that turns a MAD into a consistent estimator of σ for normal data.
pub const MAD_SCALE: f64 = 1.4826;

pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

pub fn median(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    let mut v = x.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}

/// Sample standard deviation (n − 1 denominator); `NaN` below two values.
pub fn sample_std(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    let m = mean(x);
    let ss: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (x.len() - 1) as f64).sqrt()
}

/// Weighted arithmetic mean; `NaN` when the weights sum to zero.
pub fn weighted_mean(x: &[f64], w: &[f64]) -> f64 {
    let (num, den) = x
        .iter()
        .zip(w)
        .fold((0.0, 0.0), |(num, den), (&v, &wi)| (num + v * wi, den + wi));
    if x.is_empty() || den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

/// Scaled median absolute deviation (`MAD_SCALE × median|x − median(x)|`).
pub fn scaled_mad(x: &[f64]) -> f64 {
    let med = median(x);
    let deviations: Vec<f64> = x.iter().map(|v| (v - med).abs()).collect();
    MAD_SCALE * median(&deviations)
}

pub fn min(x: &[f64]) -> f64 {
    x.iter().copied().reduce(f64::min).unwrap_or(f64::NAN)
}

pub fn max(x: &[f64]) -> f64 {
    x.iter().copied().reduce(f64::max).unwrap_or(f64::NAN)
}
