use qber_lens_common::{QberLensError, Result};
use std::io::Write;

use crate::histogram::PeriodicHistogram;
use crate::pipeline::AnalysisReport;
use crate::sweep::{GuardBandChoice, SweepResult};

/// `label,BER1,V1,BER2,V2`
pub fn result_line(report: &AnalysisReport) -> String {
    format!(
        "{},{},{},{},{}",
        report.label,
        report.unfiltered.ber,
        report.unfiltered.visibility,
        report.filtered.ber,
        report.filtered.visibility,
    )
}

pub fn sweep_lines(sweep: &SweepResult) -> String {
    let fmt_choice = |c: Option<GuardBandChoice>| match c {
        Some(c) => format!("{},{:.6}", c.guard_band_ps, c.value),
        None => "undefined,undefined".to_string(),
    };
    format!(
        "min_ber,{}\nmax_visibility,{}",
        fmt_choice(sweep.best_ber),
        fmt_choice(sweep.best_visibility)
    )
}

pub fn write_csv<W: Write>(out: &mut W, report: &AnalysisReport) -> Result<()> {
    writeln!(out, "{}", result_line(report))?;
    if let Some(sweep) = &report.sweep {
        writeln!(out, "{}", sweep_lines(sweep))?;
    }
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, value: &impl serde::Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(|e| QberLensError::Other(e.to_string()))?;
    writeln!(out)?;
    Ok(())
}

/// Dumps every populated bin as `bin,count`.
pub fn write_histogram<W: Write>(out: &mut W, hist: &PeriodicHistogram) -> Result<()> {
    writeln!(out, "bin,count")?;
    for bin in hist.nonzero_bins() {
        writeln!(out, "{},{}", bin.index, bin.count)?;
    }
    Ok(())
}
