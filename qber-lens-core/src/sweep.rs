use qber_lens_common::{MetricConvention, QberLensError, Result, SweepConfig};
use serde::Serialize;
use tracing::debug;

use crate::guard::{guarded_partition, GuardPolicy};
use crate::histogram::PeriodicHistogram;
use crate::metrics::Metrics;
use crate::window::PeakWindow;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuardBandChoice {
    pub guard_band_ps: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub candidates: usize,
    /// Lowest BER seen; `None` if no candidate had a defined BER.
    pub best_ber: Option<GuardBandChoice>,
    /// Highest visibility seen.
    pub best_visibility: Option<GuardBandChoice>,
}

/// Re-runs the guard-band filter for every width in the configured range.
/// Ties go to the narrowest band since only strict improvements replace the
/// current best.
pub fn sweep_guard_band(
    hist: &PeriodicHistogram,
    window: &PeakWindow,
    sub_bin_ps: usize,
    convention: MetricConvention,
    range: &SweepConfig,
) -> Result<SweepResult> {
    if range.step_ps == 0 {
        return Err(QberLensError::Config("sweep step must be positive".into()));
    }
    if range.min_ps > range.max_ps {
        return Err(QberLensError::Config(format!(
            "sweep range is empty: {}..={}",
            range.min_ps, range.max_ps
        )));
    }
    let mut result = SweepResult { candidates: 0, best_ber: None, best_visibility: None };
    for g in (range.min_ps..=range.max_ps).step_by(range.step_ps) {
        let sums = guarded_partition(hist, window, &GuardPolicy::new(g, sub_bin_ps));
        let metrics = Metrics::compute(&sums, convention);
        result.candidates += 1;
        if let Some(ber) = metrics.ber.value() {
            if result.best_ber.map_or(true, |b| ber < b.value) {
                result.best_ber = Some(GuardBandChoice { guard_band_ps: g, value: ber });
            }
        }
        if let Some(v) = metrics.visibility.value() {
            if result.best_visibility.map_or(true, |b| v > b.value) {
                result.best_visibility = Some(GuardBandChoice { guard_band_ps: g, value: v });
            }
        }
    }
    debug!(
        candidates = result.candidates,
        best_ber = ?result.best_ber,
        best_visibility = ?result.best_visibility,
        "guard band sweep finished"
    );
    Ok(result)
}
