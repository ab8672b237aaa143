//! Column-wide reduction of per-read profiles (majority vote).

use crate::domain::Profile;

/// Most frequent value; ties go to the smallest value.
pub fn most_frequent(values: &[usize]) -> Option<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mut best: Option<(usize, usize)> = None;
    for run in sorted.chunk_by(|a, b| a == b) {
        let count = run.len();
        match best {
            Some((_, c)) if c >= count => {}
            _ => best = Some((run[0], count)),
        }
    }
    best.map(|(v, _)| v)
}

/// Replace every read's profile by the column's most frequent peak and most
/// frequent end (voted independently), re-clamped to the profile bounds.
///
/// `profiles` is indexed `[read][column_position]`.
pub fn consensus_profiles(profiles: &[Vec<Profile>]) -> Vec<Vec<Profile>> {
    let Some(first) = profiles.first() else {
        return Vec::new();
    };
    let voted: Vec<Profile> = (0..first.len())
        .map(|pos| {
            let peaks: Vec<usize> = profiles.iter().map(|row| row[pos].peak_index).collect();
            let ends: Vec<usize> = profiles.iter().map(|row| row[pos].end_index).collect();
            let peak = most_frequent(&peaks).unwrap_or(first[pos].peak_index);
            let end = most_frequent(&ends).unwrap_or(first[pos].end_index);
            Profile::clamped(peak, end)
        })
        .collect();

    vec![voted; profiles.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_prefers_smallest_on_tie() {
        assert_eq!(most_frequent(&[2, 1, 2, 1]), Some(1));
        assert_eq!(most_frequent(&[3, 7, 7]), Some(7));
        assert_eq!(most_frequent(&[]), None);
    }

    #[test]
    fn votes_peak_and_end_independently() {
        let reads: Vec<Vec<Profile>> = [(1, 6), (1, 7), (2, 7), (1, 6), (1, 6)]
            .iter()
            .map(|&(p, e)| vec![Profile { peak_index: p, end_index: e }])
            .collect();
        let out = consensus_profiles(&reads);
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|r| r[0] == Profile { peak_index: 1, end_index: 6 }));
    }

    #[test]
    fn voted_end_is_reclamped() {
        let reads = vec![
            vec![Profile { peak_index: 4, end_index: 8 }],
            vec![Profile { peak_index: 4, end_index: 8 }],
            vec![Profile { peak_index: 0, end_index: 5 }],
            vec![Profile { peak_index: 1, end_index: 5 }],
            vec![Profile { peak_index: 2, end_index: 5 }],
        ];
        let out = consensus_profiles(&reads);
        assert_eq!(out[0][0], Profile { peak_index: 4, end_index: 8 });
    }
}
