pub mod guard;
pub mod histogram;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod sweep;
pub mod window;

pub use qber_lens_common::{Config, QberLensError, Result};

pub use guard::{guarded_partition, EdgeClass, GuardPolicy};
pub use histogram::{HistogramBin, PeriodicHistogram};
pub use ingest::{ingest_file, ingest_reader, IngestReport};
pub use metrics::{Metric, Metrics};
pub use pipeline::{analyze_file, analyze_histogram, sweep_histogram, AnalysisReport};
pub use report::{result_line, sweep_lines, write_csv, write_histogram, write_json};
pub use sweep::{sweep_guard_band, GuardBandChoice, SweepResult};
pub use window::{locate_peak_window, partition_sums, PartitionSums, PeakWindow};
