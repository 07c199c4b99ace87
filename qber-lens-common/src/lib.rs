pub mod config;
pub use config::{
    AnalysisConfig, Config, IngestConfig, IngestPolicy, MetricConvention, OutputConfig,
    OutputFormat, SweepConfig,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QberLensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("window width {width} ps exceeds histogram length {period} ps")]
    WindowTooWide { width: usize, period: usize },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, QberLensError>;
