// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file (`Pipedag.toml`):
///
/// ```toml
/// [pipeline]
/// population_url = "https://example.com/population.csv"
/// gdp_url = "https://example.com/gdp.csv"
/// work_dir = "/tmp/pipedag"
///
/// [run]
/// max_attempts = 2
/// retry_delay = "5m"
/// concurrency = 4
/// ```
///
/// All sections are optional; the defaults point at the public datasets and
/// a `/tmp` working directory, so the binary runs without any config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    /// Dataset locations and working paths from `[pipeline]`.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Retry and concurrency policy from `[run]`.
    #[serde(default)]
    pub run: RunSection,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// URL of the population dataset (CSV).
    #[serde(default = "default_population_url")]
    pub population_url: String,

    /// URL of the GDP dataset (CSV).
    #[serde(default = "default_gdp_url")]
    pub gdp_url: String,

    /// Directory for downloaded and intermediate files.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Where to write the final text report.
    ///
    /// If unset, `<work_dir>/combined_report.txt`.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

fn default_population_url() -> String {
    "https://raw.githubusercontent.com/datasets/population/master/data/population.csv".to_string()
}

fn default_gdp_url() -> String {
    "https://raw.githubusercontent.com/datasets/gdp/master/data/gdp.csv".to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("/tmp/pipedag")
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            population_url: default_population_url(),
            gdp_url: default_gdp_url(),
            work_dir: default_work_dir(),
            report_path: None,
        }
    }
}

impl PipelineSection {
    pub fn population_csv(&self) -> PathBuf {
        self.work_dir.join("raw_population.csv")
    }

    pub fn gdp_csv(&self) -> PathBuf {
        self.work_dir.join("raw_gdp.csv")
    }

    pub fn merged_csv(&self) -> PathBuf {
        self.work_dir.join("merged.csv")
    }

    pub fn report_file(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| self.work_dir.join("combined_report.txt"))
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Total attempts per task, including the first (must be >= 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between a failed attempt and the next, as a duration string
    /// (`"250ms"`, `"5s"`, `"5m"`, `"1h"`).
    #[serde(default = "default_retry_delay")]
    pub retry_delay: String,

    /// Cap on concurrently running task attempts; unset means the ready
    /// set's size is the only bound.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_delay() -> String {
    "5m".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay: default_retry_delay(),
            concurrency: None,
        }
    }
}

impl RunSection {
    /// Parsed retry delay; validation guarantees this succeeds for loaded
    /// configs.
    pub fn retry_delay_duration(&self) -> Result<Duration, String> {
        parse_duration(&self.retry_delay)
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
