use qber_lens_common::{IngestPolicy, QberLensError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use crate::histogram::{truncate_timestamp, PeriodicHistogram};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub rows_folded: u64,
    pub rows_skipped: u64,
    /// 1-based line of the malformed row that ended a strict read.
    pub stopped_at_line: Option<u64>,
}

/// Parses one data row: two comma-separated numbers, the first being the
/// timestamp in picoseconds. Anything past the second field is ignored.
pub fn parse_row(line: &str) -> Option<i64> {
    let mut fields = line.split(',');
    let ts: f64 = fields.next()?.trim().parse().ok()?;
    let _second: f64 = fields.next()?.trim().parse().ok()?;
    truncate_timestamp(ts)
}

/// Reads a header line then folds every data row into `hist`. A row that is
/// not valid UTF-8 counts as malformed; only real read failures are errors.
pub fn ingest_reader<R: BufRead>(
    mut reader: R,
    policy: IngestPolicy,
    hist: &mut PeriodicHistogram,
) -> Result<IngestReport> {
    if hist.period() == 0 {
        return Err(QberLensError::Config("period must be positive".into()));
    }
    let mut report = IngestReport::default();
    let mut buf = Vec::new();
    // header is discarded without looking at it
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(report);
    }
    let mut line_no = 1u64;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let row = std::str::from_utf8(&buf).ok();
        if row.is_some_and(|r| r.trim().is_empty()) {
            continue;
        }
        match row.and_then(parse_row) {
            Some(ts) => {
                hist.fold(ts);
                report.rows_folded += 1;
            }
            None => match policy {
                IngestPolicy::Strict => {
                    warn!(line = line_no, "malformed row, ingestion stopped");
                    report.stopped_at_line = Some(line_no);
                    break;
                }
                IngestPolicy::Lenient => {
                    debug!(line = line_no, "skipping malformed row");
                    report.rows_skipped += 1;
                }
            },
        }
    }
    if report.rows_skipped > 0 {
        warn!(skipped = report.rows_skipped, "malformed rows skipped");
    }
    Ok(report)
}

/// Builds a fresh histogram of `period_ps` bins from the file at `path`.
pub fn ingest_file(
    path: &Path,
    period_ps: usize,
    policy: IngestPolicy,
) -> Result<(PeriodicHistogram, IngestReport)> {
    let file = File::open(path).map_err(|source| QberLensError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hist = PeriodicHistogram::new(period_ps);
    let report = ingest_reader(BufReader::new(file), policy, &mut hist)?;
    debug!(path = %path.display(), rows = report.rows_folded, "histogram built");
    Ok((hist, report))
}
