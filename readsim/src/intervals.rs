//! Merging alignment intervals into a minimal non-overlapping cover.
use definitions::AlignmentRecord;

/// Merge half-open intervals. Overlapping or touching intervals become one.
/// The result is sorted by start.
pub fn merge_intervals(intervals: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut intervals: Vec<_> = intervals.iter().filter(|(s, e)| s < e).copied().collect();
    intervals.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

pub fn widest(intervals: &[(usize, usize)]) -> usize {
    intervals.iter().map(|(s, e)| e - s).max().unwrap_or(0)
}

/// Target intervals of the hits, merged.
pub fn merge_hits(hits: &[AlignmentRecord]) -> Vec<(usize, usize)> {
    let intervals: Vec<_> = hits
        .iter()
        .map(|hit| (hit.target_start, hit.target_end))
        .collect();
    merge_intervals(&intervals)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn merge() {
        let merged = merge_intervals(&[(10, 20), (0, 5), (15, 30), (30, 40), (50, 60), (7, 7)]);
        assert_eq!(merged, vec![(0, 5), (10, 40), (50, 60)]);
        assert_eq!(widest(&merged), 30);
        assert!(merge_intervals(&[]).is_empty());
        assert_eq!(widest(&[]), 0);
        let nested = merge_intervals(&[(0, 100), (10, 20), (90, 95)]);
        assert_eq!(nested, vec![(0, 100)]);
    }
}
