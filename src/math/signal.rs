//! Small 1-D signal helpers used by the curve profiler.

/// Indices of local maxima, at least `distance` samples apart.
///
/// A local maximum is strictly greater than its left neighbour and at least as
/// large as every sample up to the first strictly smaller right neighbour; a flat
/// top resolves to its midpoint (rounded down). The first and last samples are
/// never peaks. When two peaks are closer than `distance`, the higher one wins
/// (the earlier one on equal height). The result is sorted by index.
pub fn find_peaks(x: &[f64], distance: usize) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    if distance > 1 && peaks.len() > 1 {
        peaks = filter_by_distance(x, &peaks, distance);
    }
    peaks
}

fn filter_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    // Highest first; stable sort keeps the earlier peak ahead on ties.
    order.sort_by(|&a, &b| x[peaks[b]].total_cmp(&x[peaks[a]]));

    let mut keep = vec![true; peaks.len()];
    for &j in &order {
        if !keep[j] {
            continue;
        }
        for k in 0..peaks.len() {
            if k != j && keep[k] && peaks[k].abs_diff(peaks[j]) < distance {
                keep[k] = false;
            }
        }
    }

    peaks
        .iter()
        .zip(&keep)
        .filter_map(|(&p, &k)| k.then_some(p))
        .collect()
}

/// Discrete derivative with unit spacing: central differences inside,
/// one-sided differences at both ends.
pub fn gradient(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    x[1] - x[0]
                } else if i == n - 1 {
                    x[n - 1] - x[n - 2]
                } else {
                    (x[i + 1] - x[i - 1]) / 2.0
                }
            })
            .collect(),
    }
}

/// Peak-to-peak range (`max − min`); `0` for an empty slice.
pub fn ptp(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    hi - lo
}

/// Index of the first maximum.
pub fn argmax(x: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in x.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Round half away from zero to the nearest index; negative values map to 0.
pub fn round_index(v: f64) -> usize {
    if v.is_finite() && v > 0.0 { v.round() as usize } else { 0 }
}
