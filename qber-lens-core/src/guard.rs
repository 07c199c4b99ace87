//! Guard-band filtering of the C1/D1/C2 partition.
//!
//! Counts close to a sub-bin boundary are unreliable because of detector
//! jitter. Half the guard band is dropped from each side of every sub-bin,
//! except where the window meets the physical edge of the histogram.

use serde::{Deserialize, Serialize};

use crate::histogram::PeriodicHistogram;
use crate::window::{PartitionSums, PeakWindow};

/// Where an index sits relative to the edges that get special treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeClass {
    /// Bin 0 of the histogram: there is no earlier bin, only the trailing
    /// margin applies.
    AbsoluteFirst,
    /// Last bin of the window: only the leading margin applies.
    WindowLast,
    Interior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    pub guard_band_ps: usize,
    pub sub_bin_ps: usize,
}

impl GuardPolicy {
    pub fn new(guard_band_ps: usize, sub_bin_ps: usize) -> Self {
        Self { guard_band_ps, sub_bin_ps }
    }

    pub fn half(&self) -> usize {
        self.guard_band_ps / 2
    }

    /// `window_end` is exclusive. Bin 0 wins when it is also the window's last bin.
    pub fn classify(index: usize, window_end: usize) -> EdgeClass {
        if index == 0 {
            EdgeClass::AbsoluteFirst
        } else if index + 1 == window_end {
            EdgeClass::WindowLast
        } else {
            EdgeClass::Interior
        }
    }

    pub fn excludes(&self, index: usize, window_end: usize) -> bool {
        // a band as wide as the sub-bin leaves nothing behind
        if self.guard_band_ps >= self.sub_bin_ps {
            return true;
        }
        let half = self.half();
        let pos = index % self.sub_bin_ps;
        let leading = pos < half;
        let trailing = pos > self.sub_bin_ps - half;
        match Self::classify(index, window_end) {
            EdgeClass::AbsoluteFirst => trailing,
            EdgeClass::WindowLast => leading,
            EdgeClass::Interior => leading || trailing,
        }
    }
}

/// Sums the window's sub-bins, leaving out every bin the policy excludes.
pub fn guarded_partition(
    hist: &PeriodicHistogram,
    window: &PeakWindow,
    policy: &GuardPolicy,
) -> PartitionSums {
    let counts = hist.counts();
    let end = window.end();
    let mut sums = PartitionSums::default();
    for i in window.start..end {
        if !policy.excludes(i, end) {
            sums.add(window.part_of(i), counts[i]);
        }
    }
    sums
}
