//! CurveProfiler: locate the peak and the end of the diffusion Gaussian.
//!
//! Peak search:
//! - normalize the curve by its maximum and keep the first `PROFILE_WINDOW`
//!   samples
//! - fit a free candidate Gaussian starting at each of the first
//!   `CANDIDATE_COUNT` indices and score it by its summed relative residual
//! - multiply each score by four penalties (detected signal peak, distance
//!   from the maximum, dynamic range, empirical position frequency)
//! - the smallest penalized score wins
//!
//! End search: a weighted vote of up to three estimators (first rising
//! derivative, drop below a fraction of the peak, peak + 3σ), clamped by
//! `Profile::clamped`.
//!
//! The penalty constants are empirical calibration values and are kept
//! exactly as tuned.

use log::trace;
use nalgebra::DVector;

use crate::domain::{Profile, DEFAULT_MAX_EVALUATIONS, EMPTY_PEAK_INDEX};
use crate::math::signal::{argmax, find_peaks, gradient, ptp, round_index};
use crate::math::{minimize_bounded, Bounds, LmOptions};
use crate::models::candidate_gaussian;

/// Number of samples inspected by the peak search.
pub const PROFILE_WINDOW: usize = 8;
/// Candidate peak positions are `0..CANDIDATE_COUNT`.
pub const CANDIDATE_COUNT: usize = 5;

/// Historical frequency of each peak position.
pub const FREQUENCY_PENALTIES: [f64; CANDIDATE_COUNT] = [0.98, 0.45, 0.87, 0.96, 1.06];
/// Penalties used when the signal has no local maximum.
pub const NO_PEAK_PENALTIES: [f64; CANDIDATE_COUNT] = [0.5, 1.0, 1.0, 1.0, 1.0];
/// Penalty of the candidate that matches the first detected signal peak.
pub const PEAK_MATCH_PENALTY: f64 = 0.1;
/// Minimum separation of detected signal peaks, samples.
pub const PEAK_SEPARATION: usize = 4;
/// Distance penalty per sample away from the maximum.
pub const DISTANCE_PENALTY_STEP: f64 = 0.4;
/// A maximum at least this many times the runner-up is treated as an artifact.
pub const SPURIOUS_MAX_RATIO: f64 = 2.0;
/// Divisor applied to the data/fit range ratio.
pub const RANGE_PENALTY_DIVISOR: f64 = 1.5;

pub const DERIVATIVE_WEIGHT: f64 = 0.8;
pub const FRACTION_WEIGHT: f64 = 0.4;
pub const SIGMA_WEIGHT: f64 = 1.0;
/// Fraction of the peak value that marks the end of the decay.
pub const FRACTION_THRESHOLD: f64 = 0.02;
/// Number of standard deviations after which the Gaussian is considered flat.
pub const SIGMA_SPAN: f64 = 3.0;
/// End index used when no estimator produces a vote.
pub const DEFAULT_END_INDEX: usize = 7;

const SIGMA_GUESS: f64 = 3.0;
const SIGMA_MAX: f64 = 20.0;
const MEAN_SLACK: f64 = 0.5;

/// Score breakdown of one candidate peak position.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub index: usize,
    /// Summed relative residual of the candidate fit (`+∞` if the fit failed).
    pub base_error: f64,
    /// Product of the four penalty multipliers.
    pub penalty: f64,
    pub penalized_error: f64,
    /// Fitted σ, when the candidate fit converged.
    pub sigma: Option<f64>,
}

/// End-index votes, each `None` when its estimator found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EndVotes {
    pub derivative: Option<usize>,
    pub fraction: Option<usize>,
    pub sigma: Option<usize>,
}

impl EndVotes {
    /// Weighted average of the available votes, rounded; `None` without votes.
    pub fn combined(&self) -> Option<usize> {
        let votes = [
            (self.derivative, DERIVATIVE_WEIGHT),
            (self.fraction, FRACTION_WEIGHT),
            (self.sigma, SIGMA_WEIGHT),
        ];
        let (num, den) = votes
            .iter()
            .filter_map(|&(v, w)| v.map(|v| (v as f64 * w, w)))
            .fold((0.0, 0.0), |(n, d), (vw, w)| (n + vw, d + w));
        (den > 0.0).then(|| round_index(num / den))
    }
}

/// Full outcome of profiling one curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    pub profile: Profile,
    /// Empty for a curve without signal.
    pub candidates: Vec<CandidateScore>,
    pub end_votes: EndVotes,
}

/// Profile one curve: `(peak_index, end_index)`.
///
/// Deterministic and infallible; a curve without signal yields the empty
/// profile (`peak_index == EMPTY_PEAK_INDEX`).
pub fn profile_one_curve(curve: &[f64]) -> Profile {
    profile_with_report(curve).profile
}

/// Profile one curve and keep the score breakdown.
pub fn profile_with_report(curve: &[f64]) -> ProfileReport {
    let max = curve.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max.is_finite() && max > 0.0) {
        return ProfileReport {
            profile: Profile::clamped(EMPTY_PEAK_INDEX, DEFAULT_END_INDEX),
            candidates: Vec::new(),
            end_votes: EndVotes::default(),
        };
    }

    let window: Vec<f64> = curve.iter().take(PROFILE_WINDOW).map(|v| v / max).collect();

    let fits: Vec<CandidateFit> = (0..CANDIDATE_COUNT).map(|i| fit_candidate(&window, i)).collect();
    let peak_pen = signal_peak_penalties(&window);
    let dmax_pen = distance_penalties(&window);

    let candidates: Vec<CandidateScore> = fits
        .iter()
        .enumerate()
        .map(|(i, fit)| {
            let range_pen = range_penalty(window.get(i..).unwrap_or(&[]), &fit.fitted);
            let penalty = peak_pen[i] * FREQUENCY_PENALTIES[i] * dmax_pen[i] * range_pen;
            let mut penalized_error = fit.error * penalty;
            if penalized_error.is_nan() {
                penalized_error = f64::INFINITY;
            }
            CandidateScore {
                index: i,
                base_error: fit.error,
                penalty,
                penalized_error,
                sigma: fit.sigma,
            }
        })
        .collect();

    let peak_index = candidates
        .iter()
        .fold(None::<&CandidateScore>, |best, c| match best {
            Some(b) if b.penalized_error <= c.penalized_error => Some(b),
            _ => Some(c),
        })
        .map_or(0, |c| c.index);

    let end_votes = EndVotes {
        derivative: derivative_end(curve, peak_index),
        fraction: fraction_end(curve, peak_index),
        sigma: candidates[peak_index]
            .sigma
            .map(|s| round_index(peak_index as f64 + SIGMA_SPAN * s)),
    };
    let raw_end = end_votes.combined().unwrap_or(DEFAULT_END_INDEX);

    trace!("profile: peak {peak_index}, end votes {end_votes:?}");

    ProfileReport {
        profile: Profile::clamped(peak_index, raw_end),
        candidates,
        end_votes,
    }
}

#[derive(Debug, Clone)]
struct CandidateFit {
    error: f64,
    fitted: Vec<f64>,
    sigma: Option<f64>,
}

impl CandidateFit {
    fn failed() -> Self {
        Self {
            error: f64::INFINITY,
            fitted: Vec::new(),
            sigma: None,
        }
    }
}

fn fit_candidate(window: &[f64], index: usize) -> CandidateFit {
    let Some(y) = window.get(index..).filter(|y| !y.is_empty()) else {
        return CandidateFit::failed();
    };
    let x: Vec<f64> = (index..window.len()).map(|v| v as f64).collect();
    let mu = index as f64;

    let bounds = Bounds::new(&[0.0, mu - MEAN_SLACK, 0.0], &[1.0, mu + MEAN_SLACK, SIGMA_MAX]);
    let opts = LmOptions::with_budget(DEFAULT_MAX_EVALUATIONS);
    let residuals = |p: &[f64]| {
        DVector::from_iterator(
            y.len(),
            x.iter().zip(y).map(|(&xi, &yi)| candidate_gaussian(xi, p[0], p[1], p[2]) - yi),
        )
    };

    let report = match minimize_bounded(residuals, &[y[0], mu, SIGMA_GUESS], &bounds, &opts) {
        Ok(r) if r.converged => r,
        _ => return CandidateFit::failed(),
    };

    let (a, m, s) = (report.params[0], report.params[1], report.params[2]);
    let fitted: Vec<f64> = x.iter().map(|&xi| candidate_gaussian(xi, a, m, s)).collect();
    let error = y
        .iter()
        .zip(&fitted)
        .map(|(&yi, &fi)| {
            let diff = (yi - fi).abs();
            if yi == 0.0 { diff } else { diff / yi.abs() }
        })
        .sum();

    CandidateFit {
        error,
        fitted,
        sigma: Some(s),
    }
}

fn signal_peak_penalties(window: &[f64]) -> [f64; CANDIDATE_COUNT] {
    let peaks = find_peaks(window, PEAK_SEPARATION);
    match peaks.first() {
        None => NO_PEAK_PENALTIES,
        Some(&first) => {
            let mut pen = [1.0; CANDIDATE_COUNT];
            if first < CANDIDATE_COUNT {
                pen[first] = PEAK_MATCH_PENALTY;
            }
            pen
        }
    }
}

fn distance_penalties(window: &[f64]) -> [f64; CANDIDATE_COUNT] {
    let mut values = window.to_vec();
    let mut sorted = values.clone();
    sorted.sort_by(|a, b| b.total_cmp(a));
    if sorted.len() >= 2 && sorted[0] >= SPURIOUS_MAX_RATIO * sorted[1] {
        if let Some(top) = argmax(&values) {
            values[top] = 0.0;
        }
    }

    let max_index = argmax(&values).unwrap_or(0);
    let mut pen = [0.0; CANDIDATE_COUNT];
    for (i, p) in pen.iter_mut().enumerate() {
        *p = (max_index.abs_diff(i) + 1) as f64 * DISTANCE_PENALTY_STEP;
    }
    pen
}

fn range_penalty(sub_curve: &[f64], fitted: &[f64]) -> f64 {
    let fit_range = ptp(fitted);
    if fit_range == 0.0 {
        return f64::INFINITY;
    }
    (1.0 - (ptp(sub_curve) / fit_range) / RANGE_PENALTY_DIVISOR).abs()
}

fn derivative_end(curve: &[f64], peak_index: usize) -> Option<usize> {
    gradient(curve)
        .iter()
        .enumerate()
        .skip(peak_index + 1)
        .find(|&(_, &g)| g > 0.0)
        .map(|(i, _)| i)
}

fn fraction_end(curve: &[f64], peak_index: usize) -> Option<usize> {
    let threshold = curve.get(peak_index)? * FRACTION_THRESHOLD;
    // The scan starts at sample 0 on purpose: low pre-peak samples count too.
    curve
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v < threshold)
        .nth(1)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CURVE_LEN, MAX_END_INDEX, MIN_CURVE_SPAN};

    fn sharp_peak_at_1() -> Vec<f64> {
        let mut c = vec![0.0; CURVE_LEN];
        c[..9].copy_from_slice(&[0.1, 1.0, 0.7, 0.4, 0.2, 0.1, 0.05, 0.02, 0.01]);
        c
    }

    #[test]
    fn clean_peak_at_index_one() {
        let p = profile_one_curve(&sharp_peak_at_1());
        assert_eq!(p.peak_index, 1);
        assert!((5..=8).contains(&p.end_index), "end {}", p.end_index);
    }

    #[test]
    fn empty_curve_gets_sentinel_profile() {
        let p = profile_one_curve(&[0.0; CURVE_LEN]);
        assert_eq!(p.peak_index, EMPTY_PEAK_INDEX);
        assert_eq!(p.end_index, EMPTY_PEAK_INDEX + MIN_CURVE_SPAN);
        assert!(profile_one_curve(&[-1.0; CURVE_LEN]).is_empty());
    }

    #[test]
    fn peak_at_index_two_is_found() {
        let mut c = vec![0.0; CURVE_LEN];
        c[..8].copy_from_slice(&[0.05, 0.3, 1.0, 0.7, 0.4, 0.2, 0.1, 0.05]);
        let p = profile_one_curve(&c);
        assert_eq!(p.peak_index, 2);
        assert!(p.end_index >= 6 && p.end_index <= MAX_END_INDEX);
    }

    #[test]
    fn report_lists_every_candidate() {
        let r = profile_with_report(&sharp_peak_at_1());
        assert_eq!(r.candidates.len(), CANDIDATE_COUNT);
        let best = &r.candidates[r.profile.peak_index];
        assert!(r.candidates.iter().all(|c| c.penalized_error >= best.penalized_error));
        assert!(r.end_votes.fraction.is_some());
    }

    fn assert_penalties(actual: [f64; CANDIDATE_COUNT], expected: [f64; CANDIDATE_COUNT]) {
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-12, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn signal_peak_penalties_follow_the_first_peak() {
        let decaying = [1.0, 0.7, 0.4, 0.2, 0.1, 0.05, 0.02, 0.01];
        assert_eq!(signal_peak_penalties(&decaying), NO_PEAK_PENALTIES);

        let sharp = [0.1, 1.0, 0.7, 0.4, 0.2, 0.1, 0.05, 0.02];
        assert_eq!(signal_peak_penalties(&sharp), [1.0, 0.1, 1.0, 1.0, 1.0]);

        // only peak sits at 6, outside the candidates
        let late = [1.0, 0.8, 0.6, 0.4, 0.2, 0.1, 0.5, 0.3];
        assert_eq!(signal_peak_penalties(&late), [1.0; CANDIDATE_COUNT]);
    }

    #[test]
    fn valap_window_scores_the_early_bump() {
        // Overflow at the last sample: never a peak, and suppressed before the argmax.
        let valap = [0.2, 0.3, 0.25, 0.2, 0.1, 0.05, 0.02, 1.0];
        assert_eq!(signal_peak_penalties(&valap), [1.0, 0.1, 1.0, 1.0, 1.0]);
        assert_penalties(distance_penalties(&valap), [0.8, 0.4, 0.8, 1.2, 1.6]);
    }

    #[test]
    fn distance_penalties_grow_away_from_the_maximum() {
        let centered = [0.1, 0.3, 0.6, 1.0, 0.8, 0.4, 0.2, 0.1];
        assert_penalties(distance_penalties(&centered), [1.6, 1.2, 0.8, 0.4, 0.8]);

        // exactly twice the runner-up already counts as spurious
        let doubled = [0.5, 1.0, 0.25, 0.2, 0.1, 0.05, 0.02, 0.01];
        assert_penalties(distance_penalties(&doubled), [0.4, 0.8, 1.2, 1.6, 2.0]);
    }

    #[test]
    fn range_penalty_compares_data_and_fit_spread() {
        assert_eq!(range_penalty(&[1.0, 0.5], &[0.3, 0.3]), f64::INFINITY);
        assert_eq!(range_penalty(&[1.0, 0.5], &[]), f64::INFINITY);
        assert!((range_penalty(&[0.9, 0.0], &[0.9, 0.0]) - 1.0 / 3.0).abs() < 1e-12);
        assert!(range_penalty(&[1.5, 0.0], &[1.0, 0.0]).abs() < 1e-12);
    }

    #[test]
    fn fraction_end_may_vote_before_the_peak() {
        let c = [0.001, 0.001, 0.3, 0.6, 1.0, 0.6, 0.3, 0.1];
        assert_eq!(fraction_end(&c, 4), Some(1));
    }

    #[test]
    fn end_votes_are_weighted() {
        let votes = EndVotes {
            derivative: Some(6),
            fraction: None,
            sigma: Some(8),
        };
        // (6·0.8 + 8·1.0) / 1.8 = 7.11
        assert_eq!(votes.combined(), Some(7));
        assert_eq!(EndVotes::default().combined(), None);
    }

    #[test]
    fn fraction_end_takes_second_low_sample() {
        let c = [0.0, 10.0, 5.0, 0.1, 0.05, 0.0];
        assert_eq!(fraction_end(&c, 1), Some(3));
    }

    #[test]
    fn derivative_end_is_absolute() {
        let c = [0.0, 1.0, 0.5, 0.2, 0.3, 0.1];
        // gradient: [1, 0.25, -0.4, -0.1, -0.05, -0.2]
        assert_eq!(derivative_end(&c, 1), None);
        let c = [0.0, 1.0, 0.5, 0.2, 0.6, 0.7];
        assert_eq!(derivative_end(&c, 1), Some(3));
    }
}
