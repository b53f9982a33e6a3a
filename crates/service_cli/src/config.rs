//! CLI configuration management
//!
//! Handles loading configuration from a TOML file and environment variables.
//!
//! Priority (highest to lowest):
//! 1. Command line arguments (merged by each command)
//! 2. Environment variables (`LOSSSIM_*`)
//! 3. Config file
//! 4. Default values

use std::path::Path;
use std::str::FromStr;

use loss_engine::StreamKey;
use serde::{Deserialize, Deserializer};

use crate::{CliError, Result};

/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "LOSSSIM_LOG_LEVEL";
/// Environment variable overriding the worker count.
pub const ENV_WORKERS: &str = "LOSSSIM_WORKERS";
/// Environment variable overriding the output format.
pub const ENV_FORMAT: &str = "LOSSSIM_FORMAT";

/// Log levels supported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(CliError::Config(format!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                s
            ))),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// Result output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable summary table on stdout
    #[default]
    Table,
    /// Summary report as JSON
    Json,
    /// Raw samples as CSV (`trial,loss`)
    Csv,
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(CliError::InvalidArgument(format!(
                "Unknown format: {}. Supported: json, csv, table",
                other
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

fn deserialize_from_str<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = CliError>,
{
    let s = String::deserialize(deserializer)?;
    T::from_str(&s).map_err(serde::de::Error::custom)
}

/// Simulation defaults from the `[simulation]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    /// Poisson frequency rate
    pub lambda: Option<f64>,
    /// Log-severity location
    pub mu: Option<f64>,
    /// Log-severity scale
    pub sigma: Option<f64>,
    /// Number of trials
    pub samples: Option<usize>,
    /// Base seed
    pub seed: Option<u64>,
}

/// CLI configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Log level
    #[serde(deserialize_with = "deserialize_from_str")]
    pub log_level: LogLevel,
    /// Worker count; hardware parallelism when unset
    pub workers: Option<usize>,
    /// Secondary stream key policy
    pub stream_key: StreamKey,
    /// Output format
    #[serde(deserialize_with = "deserialize_from_str")]
    pub format: OutputFormat,
    /// Tail levels reported as VaR / expected shortfall
    pub quantiles: Vec<f64>,
    /// Simulation defaults
    pub simulation: SimulationSection,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            workers: None,
            stream_key: StreamKey::PartitionIndex,
            format: OutputFormat::Table,
            quantiles: vec![0.9, 0.95, 0.99, 0.995],
            simulation: SimulationSection::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: CliConfig = toml::from_str(content)
            .map_err(|e| CliError::Config(format!("Failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = LogLevel::from_str(&level)?;
        }

        if let Some(workers) = lookup(ENV_WORKERS) {
            let workers = workers.trim().parse().map_err(|_| {
                CliError::Config(format!("{} must be a positive integer, got {}", ENV_WORKERS, workers))
            })?;
            self.workers = Some(workers);
        }

        if let Some(format) = lookup(ENV_FORMAT) {
            self.format = OutputFormat::from_str(&format)?;
        }

        self.validate()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(CliError::Config("workers must be at least 1".to_string()));
        }

        if let Some(level) = self.quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(CliError::Config(format!(
                "quantile level {} is outside [0, 1]",
                level
            )));
        }

        Ok(())
    }
}

/// Build configuration from file and process environment
///
/// A missing file is only an error when the path was given explicitly.
pub fn build_config(path: Option<&Path>) -> Result<CliConfig> {
    let mut config = match path {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };

    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.workers, None);
        assert_eq!(config.stream_key, StreamKey::PartitionIndex);
        assert_eq!(config.format, OutputFormat::Table);
        assert_eq!(config.quantiles, vec![0.9, 0.95, 0.99, 0.995]);
        assert_eq!(config.simulation, SimulationSection::default());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Warn").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert!(matches!(
            OutputFormat::from_str("xml"),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_from_toml_full() {
        let config = CliConfig::from_toml(
            r#"
            log_level = "debug"
            workers = 6
            stream_key = "range-end"
            format = "json"
            quantiles = [0.5, 0.99]

            [simulation]
            lambda = 5.0
            mu = 0.0
            sigma = 1.0
            samples = 10000
            seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.workers, Some(6));
        assert_eq!(config.stream_key, StreamKey::RangeEnd);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.quantiles, vec![0.5, 0.99]);
        assert_eq!(config.simulation.lambda, Some(5.0));
        assert_eq!(config.simulation.samples, Some(10_000));
        assert_eq!(config.simulation.seed, Some(42));
    }

    #[test]
    fn test_from_toml_partial_uses_defaults() {
        let config = CliConfig::from_toml("workers = 2").unwrap();
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.format, OutputFormat::Table);
        assert_eq!(config.simulation.lambda, None);
    }

    #[test]
    fn test_from_toml_rejects_bad_values() {
        assert!(CliConfig::from_toml("workers = 0").is_err());
        assert!(CliConfig::from_toml("quantiles = [1.5]").is_err());
        assert!(CliConfig::from_toml("log_level = \"loud\"").is_err());
        assert!(CliConfig::from_toml("unknown_key = 1").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_LOG_LEVEL, "warn"),
            (ENV_WORKERS, "3"),
            (ENV_FORMAT, "csv"),
        ]
        .into_iter()
        .collect();

        let mut config = CliConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.format, OutputFormat::Csv);
    }

    #[test]
    fn test_env_rejects_bad_workers() {
        let mut config = CliConfig::default();
        let result = config.apply_env(|key| (key == ENV_WORKERS).then(|| "many".to_string()));
        assert!(matches!(result, Err(CliError::Config(_))));

        let result = config.apply_env(|key| (key == ENV_WORKERS).then(|| "0".to_string()));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "format = \"json\"\n[simulation]\nlambda = 2.5").unwrap();

        let config = CliConfig::from_file(file.path()).unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.simulation.lambda, Some(2.5));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = CliConfig::from_file(Path::new("/nonexistent/losssim.toml"));
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }
}
