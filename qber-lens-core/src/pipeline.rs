use qber_lens_common::{Config, MetricConvention, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::guard::{guarded_partition, GuardPolicy};
use crate::histogram::PeriodicHistogram;
use crate::ingest::{ingest_file, IngestReport};
use crate::metrics::Metrics;
use crate::sweep::{sweep_guard_band, SweepResult};
use crate::window::{locate_peak_window, PartitionSums, PeakWindow};

/// Everything one run produces: the peak window, metrics before and after
/// guard-band filtering, and optionally the sweep.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub label: String,
    pub convention: MetricConvention,
    pub guard_band_ps: usize,
    pub ingest: IngestReport,
    pub window: PeakWindow,
    pub unfiltered: Metrics,
    pub filtered_sums: PartitionSums,
    pub filtered: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepResult>,
}

pub fn analyze_histogram(
    hist: &PeriodicHistogram,
    ingest: IngestReport,
    config: &Config,
) -> Result<AnalysisReport> {
    let a = &config.analysis;
    let window = locate_peak_window(hist, a.window_ps)?;
    let unfiltered = Metrics::compute(&window.sums, a.convention);
    let policy = GuardPolicy::new(a.guard_band_ps, a.sub_bin_ps);
    let filtered_sums = guarded_partition(hist, &window, &policy);
    let filtered = Metrics::compute(&filtered_sums, a.convention);
    if !unfiltered.is_defined() {
        warn!(start = window.start, "unfiltered metrics undefined, too few counts in window");
    }
    if !filtered.is_defined() {
        warn!(guard_band_ps = a.guard_band_ps, "filtered metrics undefined, guard band left too few counts");
    }
    Ok(AnalysisReport {
        label: config.output.label.clone(),
        convention: a.convention,
        guard_band_ps: a.guard_band_ps,
        ingest,
        window,
        unfiltered,
        filtered_sums,
        filtered,
        sweep: None,
    })
}

/// Locates the peak window and sweeps the configured guard-band range over it.
pub fn sweep_histogram(hist: &PeriodicHistogram, config: &Config) -> Result<(PeakWindow, SweepResult)> {
    let a = &config.analysis;
    let window = locate_peak_window(hist, a.window_ps)?;
    let result = sweep_guard_band(hist, &window, a.sub_bin_ps, a.convention, &config.sweep)?;
    Ok((window, result))
}

/// Reads `path` and runs the whole analysis; with `with_sweep` the report
/// also carries the guard-band sweep.
pub fn analyze_file(path: &Path, config: &Config, with_sweep: bool) -> Result<AnalysisReport> {
    config.validate()?;
    let (hist, ingest) = ingest_file(path, config.analysis.period_ps, config.ingest.policy)?;
    info!(rows = ingest.rows_folded, path = %path.display(), "timestamps folded");
    let mut report = analyze_histogram(&hist, ingest, config)?;
    if with_sweep {
        let a = &config.analysis;
        report.sweep = Some(sweep_guard_band(&hist, &report.window, a.sub_bin_ps, a.convention, &config.sweep)?);
    }
    Ok(report)
}
