use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::QberLensError;

/// Which pair of BER/visibility formulas a run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricConvention {
    /// BER = D1 / total, V = (C1 + C2) / D1
    #[default]
    ErrorFraction,
    /// BER = 1 - D1 / total, V = D1 / (C1 + C2)
    Complementary,
}

/// What to do with a data row that does not hold two numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IngestPolicy {
    /// Stop reading at the first malformed row.
    #[default]
    Strict,
    /// Skip malformed rows and keep going.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_period")]
    pub period_ps: usize,
    #[serde(default = "default_window")]
    pub window_ps: usize,
    #[serde(default = "default_sub_bin")]
    pub sub_bin_ps: usize,
    #[serde(default = "default_guard_band")]
    pub guard_band_ps: usize,
    #[serde(default)]
    pub convention: MetricConvention,
}

fn default_period() -> usize {
    32_000 // 32 ns repetition period
}
fn default_window() -> usize {
    3_000
}
fn default_sub_bin() -> usize {
    1_000
}
fn default_guard_band() -> usize {
    100
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            period_ps: default_period(),
            window_ps: default_window(),
            sub_bin_ps: default_sub_bin(),
            guard_band_ps: default_guard_band(),
            convention: MetricConvention::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_min")]
    pub min_ps: usize,
    #[serde(default = "default_sweep_max")]
    pub max_ps: usize,
    #[serde(default = "default_sweep_step")]
    pub step_ps: usize,
}

fn default_sweep_min() -> usize {
    100
}
fn default_sweep_max() -> usize {
    300
}
fn default_sweep_step() -> usize {
    1
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_ps: default_sweep_min(),
            max_ps: default_sweep_max(),
            step_ps: default_sweep_step(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    #[serde(default)]
    pub policy: IngestPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_label() -> String {
    "M".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        if let Ok(env_path) = std::env::var("QBER_LENS_CONFIG") {
            return PathBuf::from(env_path); // $QBER_LENS_CONFIG overrides default config path
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qber-lens")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| QberLensError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| QberLensError::Other(e.to_string()))
    }

    pub fn save(&self) -> crate::Result<PathBuf> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, self.to_toml()?)?;
        Ok(path)
    }

    /// Rejects parameter combinations the analysis cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        let a = &self.analysis;
        if a.period_ps == 0 {
            return Err(QberLensError::Config("period_ps must be positive".into()));
        }
        if a.sub_bin_ps == 0 {
            return Err(QberLensError::Config("sub_bin_ps must be positive".into()));
        }
        if a.window_ps > a.period_ps {
            return Err(QberLensError::WindowTooWide { width: a.window_ps, period: a.period_ps });
        }
        if a.window_ps < 3 {
            return Err(QberLensError::Config(format!(
                "window_ps must be at least 3 to split into C1/D1/C2, got {}",
                a.window_ps
            )));
        }
        let s = &self.sweep;
        if s.step_ps == 0 {
            return Err(QberLensError::Config("sweep step_ps must be positive".into()));
        }
        if s.min_ps > s.max_ps {
            return Err(QberLensError::Config(format!(
                "sweep min_ps {} is greater than max_ps {}",
                s.min_ps, s.max_ps
            )));
        }
        if self.output.label.contains(',') {
            return Err(QberLensError::Config("output label must not contain ','".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let c = Config::default();
        assert_eq!(c.analysis.period_ps, 32_000);
        assert_eq!(c.analysis.window_ps, 3_000);
        assert_eq!(c.analysis.sub_bin_ps, 1_000);
        assert_eq!(c.analysis.guard_band_ps, 100);
        assert_eq!(c.analysis.convention, MetricConvention::ErrorFraction);
        assert_eq!((c.sweep.min_ps, c.sweep.max_ps, c.sweep.step_ps), (100, 300, 1));
        assert_eq!(c.ingest.policy, IngestPolicy::Strict);
        assert_eq!(c.output.label, "M");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c = Config::from_toml(
            "[analysis]\nguard_band_ps = 150\nconvention = \"complementary\"\n[ingest]\npolicy = \"lenient\"\n",
        )
        .unwrap();
        assert_eq!(c.analysis.guard_band_ps, 150);
        assert_eq!(c.analysis.period_ps, 32_000);
        assert_eq!(c.analysis.convention, MetricConvention::Complementary);
        assert_eq!(c.ingest.policy, IngestPolicy::Lenient);
        assert_eq!(c.output.label, "M");
    }

    #[test]
    fn toml_round_trip() {
        let mut c = Config::default();
        c.output.label = "run7".into();
        c.output.format = OutputFormat::Json;
        let back = Config::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back.output.label, "run7");
        assert_eq!(back.output.format, OutputFormat::Json);
    }

    #[test]
    fn window_wider_than_period_rejected() {
        let err = Config::from_toml("[analysis]\nperiod_ps = 2000\nwindow_ps = 3000\n").unwrap_err();
        assert!(matches!(err, QberLensError::WindowTooWide { width: 3000, period: 2000 }));
    }

    #[test]
    fn bad_sweep_range_rejected() {
        assert!(Config::from_toml("[sweep]\nmin_ps = 400\n").is_err());
        assert!(Config::from_toml("[sweep]\nstep_ps = 0\n").is_err());
    }

    #[test]
    fn garbage_toml_is_config_error() {
        let err = Config::from_toml("analysis = 3 = 4").unwrap_err();
        assert!(matches!(err, QberLensError::Config(_)));
    }

    #[test]
    fn load_honours_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[output]\nlabel = \"env\"\n").unwrap();
        std::env::set_var("QBER_LENS_CONFIG", &path);
        let loaded = Config::load();
        let missing = {
            std::env::set_var("QBER_LENS_CONFIG", dir.path().join("absent.toml"));
            Config::load()
        };
        std::env::remove_var("QBER_LENS_CONFIG");
        assert_eq!(loaded.unwrap().output.label, "env");
        assert_eq!(missing.unwrap().output.label, "M");
    }
}
