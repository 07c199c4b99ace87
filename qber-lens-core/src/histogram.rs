use serde::{Deserialize, Serialize};

/// Arrival counts folded modulo one repetition period, one bin per picosecond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicHistogram {
    bins: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub index: usize,
    pub count: u64,
}

impl PeriodicHistogram {
    pub fn new(period_ps: usize) -> Self {
        Self { bins: vec![0; period_ps] }
    }

    pub fn from_counts(bins: Vec<u64>) -> Self {
        Self { bins }
    }

    /// Folds one timestamp into the histogram. The fractional part is
    /// truncated; negative values wrap into `[0, period)`.
    pub fn fold(&mut self, timestamp_ps: i64) {
        let idx = timestamp_ps.rem_euclid(self.bins.len() as i64) as usize;
        self.bins[idx] += 1;
    }

    pub fn period(&self) -> usize {
        self.bins.len()
    }

    pub fn counts(&self) -> &[u64] {
        &self.bins
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.iter().all(|&c| c == 0)
    }

    /// Sum of `[start, start + width)`; the range must lie inside the period.
    pub(crate) fn range_sum(&self, start: usize, width: usize) -> u64 {
        self.bins[start..start + width].iter().sum()
    }

    pub fn nonzero_bins(&self) -> impl Iterator<Item = HistogramBin> + '_ {
        self.bins
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(index, &count)| HistogramBin { index, count })
    }
}

/// Converts a raw picosecond reading to the integer the fold works on.
/// `None` for NaN, infinities and magnitudes beyond `i64`.
pub fn truncate_timestamp(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let t = value.trunc();
    if t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return None;
    }
    Some(t as i64)
}
