//! Peak detection window search over a folded histogram.
//!
//! The window is found with a running sum that slides one picosecond at a
//! time, then split into three equal sub-bins: C1, D1 and C2 in index order.

use qber_lens_common::{QberLensError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::histogram::PeriodicHistogram;

/// Counts attributed to the three sub-bins of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSums {
    pub c1: u64,
    pub d1: u64,
    pub c2: u64,
}

impl PartitionSums {
    pub fn total(&self) -> u64 {
        self.c1 + self.d1 + self.c2
    }

    pub(crate) fn add(&mut self, part: Part, count: u64) {
        match part {
            Part::C1 => self.c1 += count,
            Part::D1 => self.d1 += count,
            Part::C2 => self.c2 += count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Part {
    C1,
    D1,
    C2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start: usize,
    pub width: usize,
    pub sums: PartitionSums,
}

impl PeakWindow {
    /// Exclusive upper bound.
    pub fn end(&self) -> usize {
        self.start + self.width
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end()).contains(&index)
    }

    /// Sub-bin of an absolute index inside the window. Boundaries sit at
    /// `start + width/3` and `start + 2*(width/3)`; any remainder of the
    /// division belongs to C2.
    pub(crate) fn part_of(&self, index: usize) -> Part {
        let part = self.width / 3;
        if index < self.start + part {
            Part::C1
        } else if index < self.start + 2 * part {
            Part::D1
        } else {
            Part::C2
        }
    }
}

/// Finds the `width`-wide window with the largest total count.
///
/// Ties keep the lowest start. Windows that straddle the end of the period
/// and continue at bin 0 are not considered, so `start + width <= period`.
pub fn locate_peak_window(hist: &PeriodicHistogram, width: usize) -> Result<PeakWindow> {
    let counts = hist.counts();
    let n = counts.len();
    if width > n {
        return Err(QberLensError::WindowTooWide { width, period: n });
    }
    if width < 3 {
        return Err(QberLensError::Config(format!(
            "window width must be at least 3, got {width}"
        )));
    }
    let mut sum: u64 = counts[..width].iter().sum();
    let mut best_sum = sum;
    let mut best_start = 0usize;
    for start in 1..=n - width {
        sum = sum + counts[start + width - 1] - counts[start - 1];
        if sum > best_sum {
            best_sum = sum;
            best_start = start;
        }
    }
    let mut window = PeakWindow { start: best_start, width, sums: PartitionSums::default() };
    window.sums = partition_sums(hist, &window);
    debug!(start = window.start, total = best_sum, "peak window located");
    Ok(window)
}

/// Re-scans the window and assigns each bin to C1, D1 or C2.
pub fn partition_sums(hist: &PeriodicHistogram, window: &PeakWindow) -> PartitionSums {
    let counts = hist.counts();
    let mut sums = PartitionSums::default();
    for i in window.start..window.end() {
        sums.add(window.part_of(i), counts[i]);
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist_with(period: usize, hits: &[(usize, u64)]) -> PeriodicHistogram {
        let mut bins = vec![0u64; period];
        for &(i, c) in hits {
            bins[i] = c;
        }
        PeriodicHistogram::from_counts(bins)
    }

    #[test]
    fn single_count_is_inside_window() {
        let h = hist_with(32_000, &[(5_000, 1)]);
        let w = locate_peak_window(&h, 3_000).unwrap();
        assert!(w.contains(5_000));
        assert_eq!(w.sums.total(), 1);
    }

    #[test]
    fn uniform_histogram_picks_lowest_start() {
        let h = PeriodicHistogram::from_counts(vec![1; 32_000]);
        let w = locate_peak_window(&h, 3_000).unwrap();
        assert_eq!(w.start, 0);
        assert_eq!(w.sums, PartitionSums { c1: 1_000, d1: 1_000, c2: 1_000 });
    }

    #[test]
    fn all_zero_histogram_picks_start_zero() {
        let h = PeriodicHistogram::new(32_000);
        let w = locate_peak_window(&h, 3_000).unwrap();
        assert_eq!(w.start, 0);
        assert_eq!(w.sums.total(), 0);
    }

    #[test]
    fn last_possible_start_is_reachable() {
        let h = hist_with(32_000, &[(31_999, 4)]);
        let w = locate_peak_window(&h, 3_000).unwrap();
        assert_eq!(w.start, 29_000);
        assert_eq!(w.end(), 32_000);
        assert_eq!(w.sums.c2, 4);
    }

    #[test]
    fn window_too_wide_is_config_error() {
        let h = PeriodicHistogram::new(2_000);
        let err = locate_peak_window(&h, 3_000).unwrap_err();
        assert!(matches!(err, QberLensError::WindowTooWide { width: 3_000, period: 2_000 }));
    }

    #[test]
    fn window_equal_to_period_is_allowed() {
        let h = hist_with(3_000, &[(10, 1), (1_500, 2), (2_999, 3)]);
        let w = locate_peak_window(&h, 3_000).unwrap();
        assert_eq!(w.start, 0);
        assert_eq!(w.sums, PartitionSums { c1: 1, d1: 2, c2: 3 });
    }

    #[test]
    fn partition_by_absolute_position() {
        let h = hist_with(
            32_000,
            &[(10_000, 5), (10_999, 1), (11_000, 7), (11_999, 2), (12_000, 3), (12_999, 1)],
        );
        let w = locate_peak_window(&h, 3_000).unwrap();
        // only [10_000, 13_000) holds every hit
        assert_eq!(w.start, 10_000);
        assert_eq!(w.sums, PartitionSums { c1: 6, d1: 9, c2: 4 });
    }

    #[test]
    fn remainder_goes_to_c2() {
        let h = PeriodicHistogram::from_counts(vec![1; 100]);
        let w = locate_peak_window(&h, 10).unwrap();
        // part size 3: C1 = [0,3), D1 = [3,6), C2 = [6,10)
        assert_eq!(w.sums, PartitionSums { c1: 3, d1: 3, c2: 4 });
    }

    #[test]
    fn sliding_sum_matches_brute_force() {
        // deterministic pseudo-random counts
        let mut state = 0x2545_f491_u64;
        let bins: Vec<u64> = (0..32_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                state % 5
            })
            .collect();
        let h = PeriodicHistogram::from_counts(bins);
        let w = locate_peak_window(&h, 3_000).unwrap();
        assert_eq!(w.sums.total(), h.range_sum(w.start, 3_000));
        let brute_best = (0..=32_000 - 3_000).map(|s| h.range_sum(s, 3_000)).max().unwrap();
        assert_eq!(w.sums.total(), brute_best);
        let first_best = (0..=32_000 - 3_000).find(|&s| h.range_sum(s, 3_000) == brute_best).unwrap();
        assert_eq!(w.start, first_best);
    }
}
