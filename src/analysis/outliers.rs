//! Median/MAD outlier rejection.

use crate::math::stats::{median, scaled_mad};

/// Values further than this many scaled MADs from the median are outliers.
pub const OUTLIER_MADS: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutlierSplit {
    pub kept: Vec<f64>,
    pub removed: Vec<f64>,
    /// Positions of `removed` in the input.
    pub removed_indices: Vec<usize>,
}

/// Split `values` into inliers and outliers (more than three scaled MADs from
/// the median). Non-finite values are ignored by the median/MAD and kept.
pub fn remove_outliers(values: &[f64]) -> OutlierSplit {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let center = median(&finite);
    let limit = OUTLIER_MADS * scaled_mad(&finite);

    let mut split = OutlierSplit::default();
    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() && (center - v).abs() > limit {
            split.removed.push(v);
            split.removed_indices.push(i);
        } else {
            split.kept.push(v);
        }
    }
    split
}
