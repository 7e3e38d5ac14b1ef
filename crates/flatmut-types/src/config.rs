//! Configuration loading for flatmut.
//!
//! Layered config: defaults -> default config file -> explicit config file
//! -> env vars -> CLI flags (applied by the caller).
//!
//! The default config file lives at `~/.config/flatmut/config.toml` (or the
//! platform equivalent reported by `directories`).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::metric::MetricType;

/// Index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vector dimensionality
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Metric used by search, e.g. "l2", "ip", "lp:3"
    #[serde(default)]
    pub metric: MetricType,

    /// Skip tombstoned slots during search and range search.
    /// When false, a deleted vector stays visible under its last label
    /// until its slot is recycled.
    #[serde(default = "default_exclude_tombstones")]
    pub exclude_tombstones: bool,

    /// Slots reserved in the code buffer up front
    #[serde(default)]
    pub initial_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_dimension() -> usize {
    128
}

fn default_exclude_tombstones() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            metric: MetricType::default(),
            exclude_tombstones: default_exclude_tombstones(),
            initial_capacity: 0,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Settings for a given dimension and metric, everything else defaulted.
    pub fn new(dimension: usize, metric: MetricType) -> Self {
        Self {
            dimension,
            metric,
            ..Default::default()
        }
    }

    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/flatmut/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (FLATMUT_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let default_config_path = default_config_dir().join("config");

        let mut builder = Config::builder()
            // 1. Built-in defaults
            .set_default("dimension", default_dimension() as i64)
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .set_default("metric", MetricType::default().to_string())
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .set_default("exclude_tombstones", default_exclude_tombstones())
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .set_default("initial_capacity", 0i64)
            .map_err(|e| ConfigError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| ConfigError::Config(e.to_string()))?
            // 2. Default config file
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        // 3. CLI-specified config file (higher precedence than default)
        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // 4. Environment variables: FLATMUT_DIMENSION, FLATMUT_EXCLUDE_TOMBSTONES, ...
        builder = builder.add_source(
            Environment::with_prefix("FLATMUT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ConfigError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| ConfigError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::InvalidInput(
                "dimension must be > 0".to_string(),
            ));
        }
        if let MetricType::Lp(p) = self.metric {
            if p.is_nan() || p <= 0.0 {
                return Err(ConfigError::InvalidInput(format!(
                    "Lp argument must be > 0, got {}",
                    p
                )));
            }
        }
        Ok(())
    }
}

/// Directory searched for the default config file.
pub fn default_config_dir() -> PathBuf {
    ProjectDirs::from("", "", "flatmut")
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
